//! The repository operation core.
//!
//! Every public operation of [`Repository`] runs through one of two
//! executors, [`Repository::execute`] and [`Repository::execute_async`],
//! which provide the same guarantees on both paths:
//!
//! 1. argument validation happens before the executor runs and is never
//!    logged as a failure
//! 2. async operations return [`ContextError::Cancelled`] without touching
//!    the cache or the backend if the token is already cancelled
//! 3. the storage context is created lazily (owned) or borrowed (shared)
//! 4. every call is logged as executing and executed, including key
//!    lookups served from the cache, which create no context
//! 5. a failure is logged once at error level and returned unchanged
//! 6. an owned context is disposed when the operation ends, whatever the
//!    outcome
//!
//! Composite operations (`delete_where`, `update_where`) call internal
//! helpers with the context they already hold, so they count as a single
//! top-level operation.

mod commands;
mod queries;
mod scope;

pub use scope::ContextState;

use crate::cache::entity_cache_key;
use crate::error::{RepositoryError, RepositoryResult};
use crate::interceptor::InterceptorChain;
use crate::logging::{log_with, LogLevel, Logger};
use crate::options::RepositoryOptions;
use crate::stats::RepositoryStats;
use parking_lot::Mutex;
use repokit_context::{AsyncAdapter, ContextError, Entity, Key, KeySchema, KeyValue};
use scope::ContextLease;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Storage-agnostic data access for one entity type.
///
/// A repository is meant to be driven by one logical flow of control at a
/// time. Concurrent use of the same instance is detected (see
/// [`RepositoryStats::overlapping_scopes`]) but not supported.
///
/// # Example
///
/// ```rust
/// use repokit_core::{InMemoryDatabase, KeyValue, Repository, RepositoryOptions, NullLoggerProvider};
/// # use repokit_core::Entity;
/// # #[derive(Clone, Debug, PartialEq)] struct Note { id: i64, text: String }
/// # impl Entity for Note {
/// #     fn entity_name() -> &'static str { "Note" }
/// #     fn fields() -> &'static [&'static str] { &["id", "text"] }
/// #     fn key_value(&self, f: &str) -> Option<KeyValue> { (f == "id").then(|| KeyValue::Int(self.id)) }
/// # }
/// use std::sync::Arc;
///
/// let db = InMemoryDatabase::<Note>::new().unwrap();
/// let options = RepositoryOptions::builder()
///     .with_in_memory_database(&db)
///     .with_logger_provider(Arc::new(NullLoggerProvider))
///     .build()
///     .unwrap();
/// let notes = Repository::new(options).unwrap();
///
/// let mut note = Note { id: 1, text: "hello".into() };
/// notes.add(&mut note).unwrap();
/// assert_eq!(notes.find(&[KeyValue::Int(1)]).unwrap(), Some(note));
/// assert_eq!(notes.count().unwrap(), 1);
/// ```
pub struct Repository<T: Entity> {
    options: RepositoryOptions<T>,
    logger: Arc<dyn Logger>,
    schema: KeySchema,
    chain: InterceptorChain<T>,
    active: Mutex<Option<ContextLease<T>>>,
    stats: RepositoryStats,
}

impl<T: Entity> Repository<T> {
    /// Creates a repository.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Configuration`] if `T` has no
    /// discoverable primary key under the configured conventions.
    pub fn new(options: RepositoryOptions<T>) -> RepositoryResult<Self> {
        let schema = KeySchema::resolve::<T>(options.conventions()).ok_or_else(|| {
            RepositoryError::configuration(format!(
                "{} has no discoverable primary key",
                T::entity_name()
            ))
        })?;
        let logger = options
            .logger_provider()
            .create(&format!("repokit::Repository<{}>", T::entity_name()));
        let chain = InterceptorChain::new(
            options.interceptors().clone(),
            options.interceptors_enabled(),
        );

        Ok(Self {
            options,
            logger,
            schema,
            chain,
            active: Mutex::new(None),
            stats: RepositoryStats::new(),
        })
    }

    /// Returns the options this repository was built from.
    #[must_use]
    pub fn options(&self) -> &RepositoryOptions<T> {
        &self.options
    }

    /// Returns the resolved primary key of `T`.
    #[must_use]
    pub fn key_schema(&self) -> &KeySchema {
        &self.schema
    }

    /// Returns operation statistics.
    #[must_use]
    pub fn stats(&self) -> &RepositoryStats {
        &self.stats
    }

    /// Returns the interceptor chain.
    #[must_use]
    pub fn interceptors(&self) -> &InterceptorChain<T> {
        &self.chain
    }

    /// Runs a synchronous top-level operation.
    fn execute<R, F>(&self, operation: &'static str, work: F) -> RepositoryResult<R>
    where
        F: FnOnce(&AsyncAdapter<T>) -> RepositoryResult<R>,
    {
        self.execute_cached(operation, || None, work)
    }

    /// Runs a synchronous top-level operation that `cached` may answer
    /// without a context.
    fn execute_cached<R, C, F>(&self, operation: &'static str, cached: C, work: F) -> RepositoryResult<R>
    where
        C: FnOnce() -> Option<R>,
        F: FnOnce(&AsyncAdapter<T>) -> RepositoryResult<R>,
    {
        self.begin(operation);
        let result = match self.serve(operation, cached) {
            Some(hit) => Ok(hit),
            None => self
                .enter(operation)
                .and_then(|scope| work(scope.adapter())),
        };
        self.finish(operation, result)
    }

    /// Runs an asynchronous top-level operation.
    async fn execute_async<R, F, Fut>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        work: F,
    ) -> RepositoryResult<R>
    where
        F: FnOnce(AsyncAdapter<T>) -> Fut,
        Fut: Future<Output = RepositoryResult<R>>,
    {
        self.execute_cached_async(operation, cancel, || None, work)
            .await
    }

    /// Async twin of [`execute_cached`](Repository::execute_cached). The
    /// token is checked before the cache is consulted.
    async fn execute_cached_async<R, C, F, Fut>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        cached: C,
        work: F,
    ) -> RepositoryResult<R>
    where
        C: FnOnce() -> Option<R>,
        F: FnOnce(AsyncAdapter<T>) -> Fut,
        Fut: Future<Output = RepositoryResult<R>>,
    {
        if cancel.is_cancelled() {
            return Err(ContextError::Cancelled.into());
        }
        self.begin(operation);
        let result = match self.serve(operation, cached) {
            Some(hit) => Ok(hit),
            None => match self.enter(operation) {
                Ok(scope) => {
                    let outcome = work(scope.adapter().clone()).await;
                    drop(scope);
                    outcome
                }
                Err(err) => Err(err),
            },
        };
        self.finish(operation, result)
    }

    fn serve<R, C>(&self, operation: &'static str, cached: C) -> Option<R>
    where
        C: FnOnce() -> Option<R>,
    {
        let hit = cached()?;
        log_with(self.logger.as_ref(), LogLevel::Debug, || {
            format!("{operation} served from cache")
        });
        Some(hit)
    }

    fn begin(&self, operation: &'static str) {
        self.stats.record_operation();
        log_with(self.logger.as_ref(), LogLevel::Debug, || {
            format!("{operation} executing")
        });
    }

    fn finish<R>(&self, operation: &'static str, result: RepositoryResult<R>) -> RepositoryResult<R> {
        match &result {
            Ok(_) => log_with(self.logger.as_ref(), LogLevel::Debug, || {
                format!("{operation} executed")
            }),
            Err(err) => {
                self.stats.record_failure();
                log_with(self.logger.as_ref(), LogLevel::Error, || {
                    format!("{operation} failed: {err}")
                });
            }
        }
        result
    }

    /// Validates a caller-supplied key against the key schema.
    fn key_from(&self, keys: &[KeyValue]) -> RepositoryResult<Key> {
        if keys.is_empty() {
            return Err(RepositoryError::argument_null("keys"));
        }
        if keys.len() != self.schema.arity() {
            return Err(RepositoryError::KeyArity {
                entity: self.schema.entity(),
                expected: self.schema.arity(),
                actual: keys.len(),
            });
        }
        Ok(Key::from_slice(keys))
    }

    fn cached(&self, key: &Key) -> Option<T> {
        let cache = self.options.cache_provider()?;
        let hit = cache
            .get(&entity_cache_key::<T>(key))
            .and_then(|value| value.downcast_ref::<T>().cloned());
        match hit {
            Some(entity) => {
                self.stats.record_cache_hit();
                Some(entity)
            }
            None => {
                self.stats.record_cache_miss();
                None
            }
        }
    }

    fn remember(&self, key: &Key, entity: &T) {
        if let Some(cache) = self.options.cache_provider() {
            cache.set(entity_cache_key::<T>(key), Arc::new(entity.clone()));
        }
    }

    fn forget(&self, entities: &[T]) {
        let Some(cache) = self.options.cache_provider() else {
            return;
        };
        for entity in entities {
            if let Ok(key) = self.schema.key_of(entity) {
                cache.remove(&entity_cache_key::<T>(&key));
            }
        }
    }
}

impl<T: Entity> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &T::entity_name())
            .field("key", &self.schema.fields())
            .field("state", &self.context_state())
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}
