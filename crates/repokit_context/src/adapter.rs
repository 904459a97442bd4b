//! Uniform asynchronous surface over storage contexts.

use crate::context::{AsyncStorageContext, StorageContext};
use crate::entity::{Entity, Key};
use crate::envelope::ResultEnvelope;
use crate::error::{ContextError, ContextResult};
use crate::query::QueryOptions;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A storage context wrapped with its asynchronous capability.
///
/// The capability is decided once, when the context is wrapped:
///
/// - [`AsyncAdapter::NativeAsync`] delegates every `*_async` call to the
///   backend's own [`AsyncStorageContext`] implementation and passes the
///   cancellation token through unchanged.
/// - [`AsyncAdapter::SyncOnly`] runs the synchronous method on the calling
///   task and returns its result as an already-completed future. The token
///   is checked once at the seam; a synchronous call already in flight
///   cannot be interrupted.
///
/// The adapter adds no failure modes of its own beyond that seam check:
/// errors from the wrapped context come back exactly as produced.
///
/// # Example
///
/// ```rust
/// use repokit_context::{AsyncAdapter, InMemoryDatabase, Entity, KeyValue};
/// # #[derive(Clone)] struct Note { id: i64 }
/// # impl Entity for Note {
/// #     fn entity_name() -> &'static str { "Note" }
/// #     fn fields() -> &'static [&'static str] { &["id"] }
/// #     fn key_value(&self, f: &str) -> Option<KeyValue> { (f == "id").then(|| KeyValue::Int(self.id)) }
/// # }
///
/// let db = InMemoryDatabase::<Note>::new().unwrap();
/// let adapter = AsyncAdapter::sync_only(db.context());
/// assert!(!adapter.is_native_async());
/// ```
pub enum AsyncAdapter<T: Entity> {
    /// The backend implements the asynchronous surface itself.
    NativeAsync {
        /// Synchronous view of the same context.
        context: Arc<dyn StorageContext<T>>,
        /// Native asynchronous view.
        native: Arc<dyn AsyncStorageContext<T>>,
    },
    /// The backend only implements the synchronous surface.
    SyncOnly(Arc<dyn StorageContext<T>>),
}

impl<T: Entity> AsyncAdapter<T> {
    /// Wraps a context that only supports synchronous access.
    pub fn sync_only<C>(context: C) -> Self
    where
        C: StorageContext<T> + 'static,
    {
        Self::SyncOnly(Arc::new(context))
    }

    /// Wraps a shared synchronous context.
    pub fn from_sync_arc<C>(context: Arc<C>) -> Self
    where
        C: StorageContext<T> + 'static,
    {
        Self::SyncOnly(context)
    }

    /// Wraps a context with native asynchronous support.
    pub fn native<C>(context: C) -> Self
    where
        C: AsyncStorageContext<T> + 'static,
    {
        Self::from_native_arc(Arc::new(context))
    }

    /// Wraps a shared context with native asynchronous support.
    pub fn from_native_arc<C>(context: Arc<C>) -> Self
    where
        C: AsyncStorageContext<T> + 'static,
    {
        let sync: Arc<dyn StorageContext<T>> = context.clone();
        Self::NativeAsync {
            context: sync,
            native: context,
        }
    }

    /// Returns true if asynchronous calls reach the backend natively.
    #[must_use]
    pub fn is_native_async(&self) -> bool {
        matches!(self, Self::NativeAsync { .. })
    }

    /// Returns the synchronous view of the wrapped context.
    #[must_use]
    pub fn context(&self) -> &dyn StorageContext<T> {
        match self {
            Self::NativeAsync { context, .. } => context.as_ref(),
            Self::SyncOnly(context) => context.as_ref(),
        }
    }

    /// Returns true if both adapters wrap the same context instance.
    #[must_use]
    pub fn same_context(&self, other: &Self) -> bool {
        Arc::ptr_eq(self.shared(), other.shared())
    }

    fn shared(&self) -> &Arc<dyn StorageContext<T>> {
        match self {
            Self::NativeAsync { context, .. } => context,
            Self::SyncOnly(context) => context,
        }
    }

    fn check(cancel: &CancellationToken) -> ContextResult<()> {
        if cancel.is_cancelled() {
            Err(ContextError::Cancelled)
        } else {
            Ok(())
        }
    }

    // === Synchronous surface ===

    /// Tracks an entity for insertion.
    pub fn add(&self, entity: &T) -> ContextResult<()> {
        self.context().add(entity)
    }

    /// Tracks an entity for update.
    pub fn update(&self, entity: &T) -> ContextResult<()> {
        self.context().update(entity)
    }

    /// Tracks an entity for removal.
    pub fn remove(&self, entity: &T) -> ContextResult<()> {
        self.context().remove(entity)
    }

    /// Persists tracked changes.
    pub fn save_changes(&self) -> ContextResult<usize> {
        self.context().save_changes()
    }

    /// Finds an entity by key.
    pub fn find(&self, key: &Key) -> ContextResult<Option<T>> {
        self.context().find(key)
    }

    /// Returns the first selected entity.
    pub fn find_first(&self, options: &QueryOptions<T>) -> ContextResult<ResultEnvelope<Option<T>>> {
        self.context().find_first(options)
    }

    /// Returns all selected entities.
    pub fn find_all(&self, options: &QueryOptions<T>) -> ContextResult<ResultEnvelope<Vec<T>>> {
        self.context().find_all(options)
    }

    /// Counts matching entities.
    pub fn count(&self, options: &QueryOptions<T>) -> ContextResult<ResultEnvelope<usize>> {
        self.context().count(options)
    }

    /// Tests whether any entity matches.
    pub fn exists(&self, options: &QueryOptions<T>) -> ContextResult<ResultEnvelope<bool>> {
        self.context().exists(options)
    }

    /// Disposes the wrapped context.
    pub fn dispose(&self) {
        self.context().dispose();
    }

    /// Returns true once the wrapped context is disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.context().is_disposed()
    }

    // === Asynchronous surface ===

    /// Tracks an entity for insertion.
    pub async fn add_async(&self, entity: &T, cancel: &CancellationToken) -> ContextResult<()> {
        match self {
            Self::NativeAsync { native, .. } => native.add_async(entity, cancel).await,
            Self::SyncOnly(context) => {
                Self::check(cancel)?;
                context.add(entity)
            }
        }
    }

    /// Tracks an entity for update.
    pub async fn update_async(&self, entity: &T, cancel: &CancellationToken) -> ContextResult<()> {
        match self {
            Self::NativeAsync { native, .. } => native.update_async(entity, cancel).await,
            Self::SyncOnly(context) => {
                Self::check(cancel)?;
                context.update(entity)
            }
        }
    }

    /// Tracks an entity for removal.
    pub async fn remove_async(&self, entity: &T, cancel: &CancellationToken) -> ContextResult<()> {
        match self {
            Self::NativeAsync { native, .. } => native.remove_async(entity, cancel).await,
            Self::SyncOnly(context) => {
                Self::check(cancel)?;
                context.remove(entity)
            }
        }
    }

    /// Persists tracked changes.
    pub async fn save_changes_async(&self, cancel: &CancellationToken) -> ContextResult<usize> {
        match self {
            Self::NativeAsync { native, .. } => native.save_changes_async(cancel).await,
            Self::SyncOnly(context) => {
                Self::check(cancel)?;
                context.save_changes()
            }
        }
    }

    /// Finds an entity by key.
    pub async fn find_async(&self, key: &Key, cancel: &CancellationToken) -> ContextResult<Option<T>> {
        match self {
            Self::NativeAsync { native, .. } => native.find_async(key, cancel).await,
            Self::SyncOnly(context) => {
                Self::check(cancel)?;
                context.find(key)
            }
        }
    }

    /// Returns the first selected entity.
    pub async fn find_first_async(
        &self,
        options: &QueryOptions<T>,
        cancel: &CancellationToken,
    ) -> ContextResult<ResultEnvelope<Option<T>>> {
        match self {
            Self::NativeAsync { native, .. } => native.find_first_async(options, cancel).await,
            Self::SyncOnly(context) => {
                Self::check(cancel)?;
                context.find_first(options)
            }
        }
    }

    /// Returns all selected entities.
    pub async fn find_all_async(
        &self,
        options: &QueryOptions<T>,
        cancel: &CancellationToken,
    ) -> ContextResult<ResultEnvelope<Vec<T>>> {
        match self {
            Self::NativeAsync { native, .. } => native.find_all_async(options, cancel).await,
            Self::SyncOnly(context) => {
                Self::check(cancel)?;
                context.find_all(options)
            }
        }
    }

    /// Counts matching entities.
    pub async fn count_async(
        &self,
        options: &QueryOptions<T>,
        cancel: &CancellationToken,
    ) -> ContextResult<ResultEnvelope<usize>> {
        match self {
            Self::NativeAsync { native, .. } => native.count_async(options, cancel).await,
            Self::SyncOnly(context) => {
                Self::check(cancel)?;
                context.count(options)
            }
        }
    }

    /// Tests whether any entity matches.
    pub async fn exists_async(
        &self,
        options: &QueryOptions<T>,
        cancel: &CancellationToken,
    ) -> ContextResult<ResultEnvelope<bool>> {
        match self {
            Self::NativeAsync { native, .. } => native.exists_async(options, cancel).await,
            Self::SyncOnly(context) => {
                Self::check(cancel)?;
                context.exists(options)
            }
        }
    }
}

impl<T: Entity> Clone for AsyncAdapter<T> {
    fn clone(&self) -> Self {
        match self {
            Self::NativeAsync { context, native } => Self::NativeAsync {
                context: Arc::clone(context),
                native: Arc::clone(native),
            },
            Self::SyncOnly(context) => Self::SyncOnly(Arc::clone(context)),
        }
    }
}

impl<T: Entity> fmt::Debug for AsyncAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.is_native_async() {
            "NativeAsync"
        } else {
            "SyncOnly"
        };
        f.debug_struct("AsyncAdapter")
            .field("mode", &mode)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::KeyValue;
    use crate::memory::InMemoryDatabase;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: i64,
    }

    impl Entity for Note {
        fn entity_name() -> &'static str {
            "Note"
        }
        fn fields() -> &'static [&'static str] {
            &["id"]
        }
        fn key_value(&self, field: &str) -> Option<KeyValue> {
            (field == "id").then(|| KeyValue::Int(self.id))
        }
    }

    #[tokio::test]
    async fn sync_only_completes_through_sync_calls() {
        let db = InMemoryDatabase::<Note>::new().unwrap();
        let adapter = AsyncAdapter::sync_only(db.context());
        let cancel = CancellationToken::new();

        adapter.add_async(&Note { id: 1 }, &cancel).await.unwrap();
        assert_eq!(adapter.save_changes_async(&cancel).await.unwrap(), 1);

        let found = adapter
            .find_async(&Key::from(KeyValue::Int(1)), &cancel)
            .await
            .unwrap();
        assert_eq!(found, Some(Note { id: 1 }));
    }

    #[tokio::test]
    async fn sync_only_checks_cancellation_at_the_seam() {
        let db = InMemoryDatabase::<Note>::new().unwrap();
        let adapter = AsyncAdapter::sync_only(db.context());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = adapter.add_async(&Note { id: 1 }, &cancel).await.unwrap_err();
        assert_eq!(err, ContextError::Cancelled);
        assert_eq!(db.len(), 0);
    }

    #[tokio::test]
    async fn sync_only_propagates_errors_unchanged() {
        let db = InMemoryDatabase::<Note>::new().unwrap();
        let adapter = AsyncAdapter::sync_only(db.context());
        adapter.dispose();

        let err = adapter
            .add_async(&Note { id: 1 }, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, adapter.add(&Note { id: 1 }).unwrap_err());
    }

    #[test]
    fn clones_share_the_context() {
        let db = InMemoryDatabase::<Note>::new().unwrap();
        let a = AsyncAdapter::sync_only(db.context());
        let b = a.clone();
        let c = AsyncAdapter::sync_only(db.context());
        assert!(a.same_context(&b));
        assert!(!a.same_context(&c));
    }
}
