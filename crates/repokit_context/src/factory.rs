//! Context factories.

use crate::adapter::AsyncAdapter;
use crate::entity::Entity;
use crate::error::ContextResult;
use std::fmt;

/// Creates storage contexts on demand.
///
/// Every call must return a new, ready-to-use context. The repository
/// calls the factory lazily, at most once per top-level operation, and
/// disposes what it gets back when that operation completes.
pub trait ContextFactory<T: Entity>: Send + Sync {
    /// Opens a new context, already wrapped with its async capability.
    fn create(&self) -> ContextResult<AsyncAdapter<T>>;
}

/// A [`ContextFactory`] backed by a closure.
///
/// ```rust
/// use repokit_context::{AsyncAdapter, ContextFactory, ContextResult, FnContextFactory, InMemoryDatabase};
/// # use repokit_context::{Entity, KeyValue};
/// # #[derive(Clone)] struct Note { id: i64 }
/// # impl Entity for Note {
/// #     fn entity_name() -> &'static str { "Note" }
/// #     fn fields() -> &'static [&'static str] { &["id"] }
/// #     fn key_value(&self, f: &str) -> Option<KeyValue> { (f == "id").then(|| KeyValue::Int(self.id)) }
/// # }
///
/// let db = InMemoryDatabase::<Note>::new().unwrap();
/// let factory: &dyn ContextFactory<Note> =
///     &FnContextFactory::new(move || -> ContextResult<AsyncAdapter<Note>> {
///         Ok(AsyncAdapter::sync_only(db.context()))
///     });
/// assert!(factory.create().is_ok());
/// ```
pub struct FnContextFactory<F> {
    create: F,
}

impl<F> FnContextFactory<F> {
    /// Wraps a closure as a factory.
    pub fn new(create: F) -> Self {
        Self { create }
    }
}

impl<T, F> ContextFactory<T> for FnContextFactory<F>
where
    T: Entity,
    F: Fn() -> ContextResult<AsyncAdapter<T>> + Send + Sync,
{
    fn create(&self) -> ContextResult<AsyncAdapter<T>> {
        (self.create)()
    }
}

impl<F> fmt::Debug for FnContextFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnContextFactory").finish_non_exhaustive()
    }
}
