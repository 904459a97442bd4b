//! Cache provider abstraction.
//!
//! The cache is opaque to the repository: it stores type-erased values
//! under string keys and decides eviction on its own. The repository only
//! reads through it for key lookups and invalidates entries touched by a
//! successful mutation.

use parking_lot::RwLock;
use repokit_context::{Entity, Key};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A type-erased cached value.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// A pluggable cache.
pub trait CacheProvider: Send + Sync {
    /// Returns the value cached under `key`.
    fn get(&self, key: &str) -> Option<CachedValue>;

    /// Caches `value` under `key`, replacing any previous value.
    fn set(&self, key: String, value: CachedValue);

    /// Removes `key`. Returns true if it was present.
    fn remove(&self, key: &str) -> bool;

    /// Removes every entry.
    fn clear(&self);
}

/// An unbounded in-process cache.
#[derive(Default)]
pub struct InMemoryCacheProvider {
    entries: RwLock<HashMap<String, CachedValue>>,
}

impl InMemoryCacheProvider {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CacheProvider for InMemoryCacheProvider {
    fn get(&self, key: &str) -> Option<CachedValue> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: String, value: CachedValue) {
        self.entries.write().insert(key, value);
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

impl fmt::Debug for InMemoryCacheProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryCacheProvider")
            .field("entries", &self.len())
            .finish()
    }
}

/// Cache key for an entity row.
pub(crate) fn entity_cache_key<T: Entity>(key: &Key) -> String {
    format!("{}:{}", T::entity_name(), key)
}
