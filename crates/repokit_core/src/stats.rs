//! Repository statistics.
//!
//! Counters are atomic and can be read while operations are in progress.
//!
//! ```rust,ignore
//! let stats = repository.stats();
//! println!("contexts created: {}", stats.contexts_created());
//! println!("failures: {}", stats.failures());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-repository operation counters.
#[derive(Debug, Default)]
pub struct RepositoryStats {
    /// Top-level operations started.
    operations: AtomicU64,
    /// Top-level operations that returned an operation error.
    failures: AtomicU64,
    /// Contexts obtained from the factory.
    contexts_created: AtomicU64,
    /// Owned contexts disposed.
    contexts_released: AtomicU64,
    /// Top-level calls that found another call already in flight.
    overlapping_scopes: AtomicU64,
    /// Top-level calls made from inside another call on the same thread.
    nested_scopes: AtomicU64,
    /// Key lookups served from the cache.
    cache_hits: AtomicU64,
    /// Key lookups that missed the cache.
    cache_misses: AtomicU64,
}

impl RepositoryStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_operation(&self) {
        self.operations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_context_created(&self) {
        self.contexts_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_context_released(&self) {
        self.contexts_released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_overlap(&self) {
        self.overlapping_scopes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_nested(&self) {
        self.nested_scopes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of top-level operations started.
    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    /// Returns the number of failed top-level operations.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Returns the number of contexts created through the factory.
    pub fn contexts_created(&self) -> u64 {
        self.contexts_created.load(Ordering::Relaxed)
    }

    /// Returns the number of owned contexts disposed.
    pub fn contexts_released(&self) -> u64 {
        self.contexts_released.load(Ordering::Relaxed)
    }

    /// Returns how many top-level calls overlapped another call on the
    /// same repository. Anything above zero means the repository was used
    /// concurrently, which it does not support.
    pub fn overlapping_scopes(&self) -> u64 {
        self.overlapping_scopes.load(Ordering::Relaxed)
    }

    /// Returns how many top-level calls were made from inside another call
    /// on the same thread, such as a query issued by an interceptor.
    pub fn nested_scopes(&self) -> u64 {
        self.nested_scopes.load(Ordering::Relaxed)
    }

    /// Returns the number of cache hits.
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Returns the number of cache misses.
    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            operations: self.operations(),
            failures: self.failures(),
            contexts_created: self.contexts_created(),
            contexts_released: self.contexts_released(),
            overlapping_scopes: self.overlapping_scopes(),
            nested_scopes: self.nested_scopes(),
            cache_hits: self.cache_hits(),
            cache_misses: self.cache_misses(),
        }
    }
}

/// A point-in-time copy of [`RepositoryStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Top-level operations started.
    pub operations: u64,
    /// Failed top-level operations.
    pub failures: u64,
    /// Contexts created through the factory.
    pub contexts_created: u64,
    /// Owned contexts disposed.
    pub contexts_released: u64,
    /// Overlapping top-level calls detected.
    pub overlapping_scopes: u64,
    /// Nested top-level calls on the same thread.
    pub nested_scopes: u64,
    /// Cache hits.
    pub cache_hits: u64,
    /// Cache misses.
    pub cache_misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let stats = RepositoryStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn snapshot() {
        let stats = RepositoryStats::new();
        stats.record_operation();
        stats.record_operation();
        stats.record_failure();
        stats.record_context_created();
        stats.record_context_released();
        stats.record_cache_miss();
        stats.record_nested();

        let snap = stats.snapshot();
        assert_eq!(snap.operations, 2);
        assert_eq!(snap.failures, 1);
        assert_eq!(snap.contexts_created, 1);
        assert_eq!(snap.contexts_released, 1);
        assert_eq!(snap.cache_misses, 1);
        assert_eq!(snap.cache_hits, 0);
        assert_eq!(snap.nested_scopes, 1);
        assert_eq!(snap.overlapping_scopes, 0);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(RepositoryStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        s.record_operation();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.operations(), 800);
    }
}
