//! Storage context capability traits.

use crate::entity::{Entity, Key};
use crate::envelope::ResultEnvelope;
use crate::error::ContextResult;
use crate::query::QueryOptions;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A scoped handle to one backend connection or session.
///
/// Contexts track pending changes; nothing is durable until
/// [`save_changes`](StorageContext::save_changes) succeeds.
///
/// # Invariants
///
/// - Once [`dispose`](StorageContext::dispose) has been called, every
///   other method fails with [`ContextError::Disposed`](crate::ContextError::Disposed)
/// - `dispose` is idempotent
/// - Implementations must be `Send + Sync`; a context shared by a unit of
///   work may back several repositories at once
///
/// Only the row-level primitives are required. `find_first`, `count` and
/// `exists` have default implementations in terms of `find_all` that a
/// backend may override with native queries.
pub trait StorageContext<T: Entity>: Send + Sync {
    /// Tracks an entity for insertion.
    fn add(&self, entity: &T) -> ContextResult<()>;

    /// Tracks an entity for update.
    fn update(&self, entity: &T) -> ContextResult<()>;

    /// Tracks an entity for removal.
    fn remove(&self, entity: &T) -> ContextResult<()>;

    /// Persists all tracked changes, returning the number of affected rows.
    fn save_changes(&self) -> ContextResult<usize>;

    /// Finds an entity by primary key.
    fn find(&self, key: &Key) -> ContextResult<Option<T>>;

    /// Returns every entity selected by `options`.
    ///
    /// The envelope total is the number of rows matching the filter before
    /// paging.
    fn find_all(&self, options: &QueryOptions<T>) -> ContextResult<ResultEnvelope<Vec<T>>>;

    /// Returns the first entity selected by `options`.
    fn find_first(&self, options: &QueryOptions<T>) -> ContextResult<ResultEnvelope<Option<T>>> {
        let (rows, total) = self.find_all(options)?.into_parts();
        let first = rows.into_iter().next();
        Ok(match total {
            Some(total) => ResultEnvelope::with_total(first, total),
            None => ResultEnvelope::scalar(first),
        })
    }

    /// Counts the entities matching the filter of `options`.
    ///
    /// Paging is ignored.
    fn count(&self, options: &QueryOptions<T>) -> ContextResult<ResultEnvelope<usize>> {
        let rows = self.find_all(&options.without_paging())?;
        Ok(ResultEnvelope::scalar(rows.len()))
    }

    /// Returns true if any entity matches the filter of `options`.
    fn exists(&self, options: &QueryOptions<T>) -> ContextResult<ResultEnvelope<bool>> {
        let count = self.count(options)?.into_result();
        Ok(ResultEnvelope::scalar(count > 0))
    }

    /// Releases the backend connection. Idempotent.
    fn dispose(&self);

    /// Returns true once the context has been disposed.
    fn is_disposed(&self) -> bool;
}

/// Native asynchronous capability of a storage context.
///
/// Backends that only implement [`StorageContext`] still get an
/// asynchronous surface through [`AsyncAdapter`](crate::AsyncAdapter);
/// implementing this trait lets the adapter delegate directly, passing the
/// cancellation token through.
#[async_trait]
pub trait AsyncStorageContext<T: Entity>: StorageContext<T> {
    /// Tracks an entity for insertion.
    async fn add_async(&self, entity: &T, cancel: &CancellationToken) -> ContextResult<()>;

    /// Tracks an entity for update.
    async fn update_async(&self, entity: &T, cancel: &CancellationToken) -> ContextResult<()>;

    /// Tracks an entity for removal.
    async fn remove_async(&self, entity: &T, cancel: &CancellationToken) -> ContextResult<()>;

    /// Persists all tracked changes.
    async fn save_changes_async(&self, cancel: &CancellationToken) -> ContextResult<usize>;

    /// Finds an entity by primary key.
    async fn find_async(&self, key: &Key, cancel: &CancellationToken) -> ContextResult<Option<T>>;

    /// Returns every entity selected by `options`.
    async fn find_all_async(
        &self,
        options: &QueryOptions<T>,
        cancel: &CancellationToken,
    ) -> ContextResult<ResultEnvelope<Vec<T>>>;

    /// Returns the first entity selected by `options`.
    async fn find_first_async(
        &self,
        options: &QueryOptions<T>,
        cancel: &CancellationToken,
    ) -> ContextResult<ResultEnvelope<Option<T>>> {
        let (rows, total) = self.find_all_async(options, cancel).await?.into_parts();
        let first = rows.into_iter().next();
        Ok(match total {
            Some(total) => ResultEnvelope::with_total(first, total),
            None => ResultEnvelope::scalar(first),
        })
    }

    /// Counts the entities matching the filter of `options`.
    async fn count_async(
        &self,
        options: &QueryOptions<T>,
        cancel: &CancellationToken,
    ) -> ContextResult<ResultEnvelope<usize>> {
        let rows = self.find_all_async(&options.without_paging(), cancel).await?;
        Ok(ResultEnvelope::scalar(rows.len()))
    }

    /// Returns true if any entity matches the filter of `options`.
    async fn exists_async(
        &self,
        options: &QueryOptions<T>,
        cancel: &CancellationToken,
    ) -> ContextResult<ResultEnvelope<bool>> {
        let count = self.count_async(options, cancel).await?.into_result();
        Ok(ResultEnvelope::scalar(count > 0))
    }
}
