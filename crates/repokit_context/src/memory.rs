//! In-memory storage backend.

use crate::adapter::AsyncAdapter;
use crate::context::StorageContext;
use crate::conventions::{Conventions, KeySchema};
use crate::entity::{Entity, Key};
use crate::envelope::ResultEnvelope;
use crate::error::{ContextError, ContextResult};
use crate::factory::ContextFactory;
use crate::query::QueryOptions;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

struct Shared<T> {
    schema: KeySchema,
    rows: RwLock<BTreeMap<Key, T>>,
}

/// An in-memory row store for one entity type.
///
/// The database outlives the contexts opened on it, so data committed
/// through one context is visible to the next. Suitable for:
/// - Unit and integration tests
/// - Ephemeral stores that don't need persistence
///
/// # Thread Safety
///
/// Cloning the database is cheap and every clone shares the same rows.
///
/// # Example
///
/// ```rust
/// use repokit_context::{Entity, InMemoryDatabase, KeyValue, StorageContext};
/// # #[derive(Clone)] struct Note { id: i64 }
/// # impl Entity for Note {
/// #     fn entity_name() -> &'static str { "Note" }
/// #     fn fields() -> &'static [&'static str] { &["id"] }
/// #     fn key_value(&self, f: &str) -> Option<KeyValue> { (f == "id").then(|| KeyValue::Int(self.id)) }
/// # }
///
/// let db = InMemoryDatabase::<Note>::new().unwrap();
/// let ctx = db.context();
/// ctx.add(&Note { id: 1 }).unwrap();
/// assert_eq!(db.len(), 0);
/// ctx.save_changes().unwrap();
/// assert_eq!(db.len(), 1);
/// ```
pub struct InMemoryDatabase<T: Entity> {
    shared: Arc<Shared<T>>,
}

impl<T: Entity> InMemoryDatabase<T> {
    /// Creates an empty database using the default conventions.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::NoPrimaryKey`] if `T` has no discoverable key.
    pub fn new() -> ContextResult<Self> {
        Self::with_conventions(&Conventions::default())
    }

    /// Creates an empty database using the given conventions.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::NoPrimaryKey`] if `T` has no discoverable key.
    pub fn with_conventions(conventions: &Conventions) -> ContextResult<Self> {
        let schema = KeySchema::resolve::<T>(conventions).ok_or(ContextError::NoPrimaryKey {
            entity: T::entity_name(),
        })?;
        Ok(Self {
            shared: Arc::new(Shared {
                schema,
                rows: RwLock::new(BTreeMap::new()),
            }),
        })
    }

    /// Opens a new context on this database.
    #[must_use]
    pub fn context(&self) -> InMemoryContext<T> {
        InMemoryContext {
            id: Uuid::new_v4(),
            shared: Arc::clone(&self.shared),
            pending: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Returns a factory that opens a fresh context per call.
    #[must_use]
    pub fn factory(&self) -> InMemoryContextFactory<T> {
        InMemoryContextFactory { db: self.clone() }
    }

    /// Returns the key schema rows are stored under.
    #[must_use]
    pub fn schema(&self) -> &KeySchema {
        &self.shared.schema
    }

    /// Number of committed rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.rows.read().len()
    }

    /// Returns true if no rows are committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.rows.read().is_empty()
    }

    /// Returns a copy of every committed row, in key order.
    #[must_use]
    pub fn rows(&self) -> Vec<T> {
        self.shared.rows.read().values().cloned().collect()
    }

    /// Removes every committed row.
    pub fn clear(&self) {
        self.shared.rows.write().clear();
    }
}

impl<T: Entity> Clone for InMemoryDatabase<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Entity> fmt::Debug for InMemoryDatabase<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryDatabase")
            .field("entity", &T::entity_name())
            .field("rows", &self.len())
            .finish()
    }
}

enum Pending<T> {
    Add(Key, T),
    Update(Key, T),
    Remove(Key),
}

/// A unit-of-work style context over an [`InMemoryDatabase`].
///
/// Changes are tracked until [`save_changes`](StorageContext::save_changes),
/// which applies them atomically: either every tracked change is committed
/// or none is.
pub struct InMemoryContext<T: Entity> {
    id: Uuid,
    shared: Arc<Shared<T>>,
    pending: Mutex<Vec<Pending<T>>>,
    disposed: AtomicBool,
}

impl<T: Entity> InMemoryContext<T> {
    /// Returns the unique identifier of this context instance.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of tracked, unsaved changes.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    fn ensure_open(&self) -> ContextResult<()> {
        if self.disposed.load(Ordering::Acquire) {
            Err(ContextError::Disposed)
        } else {
            Ok(())
        }
    }

    fn track(&self, entity: &T, make: impl FnOnce(Key, T) -> Pending<T>) -> ContextResult<()> {
        self.ensure_open()?;
        let key = self.shared.schema.key_of(entity)?;
        self.pending.lock().push(make(key, entity.clone()));
        Ok(())
    }
}

impl<T: Entity> StorageContext<T> for InMemoryContext<T> {
    fn add(&self, entity: &T) -> ContextResult<()> {
        self.track(entity, Pending::Add)
    }

    fn update(&self, entity: &T) -> ContextResult<()> {
        self.track(entity, Pending::Update)
    }

    fn remove(&self, entity: &T) -> ContextResult<()> {
        self.track(entity, |key, _| Pending::Remove(key))
    }

    fn save_changes(&self) -> ContextResult<usize> {
        self.ensure_open()?;
        let changes = std::mem::take(&mut *self.pending.lock());
        if changes.is_empty() {
            return Ok(0);
        }

        let entity = self.shared.schema.entity();
        let mut rows = self.shared.rows.write();

        // Stage against an overlay so a failing change leaves rows untouched.
        let mut overlay: HashMap<Key, Option<T>> = HashMap::new();
        let exists = |overlay: &HashMap<Key, Option<T>>, key: &Key| match overlay.get(key) {
            Some(staged) => staged.is_some(),
            None => rows.contains_key(key),
        };

        let affected = changes.len();
        for change in changes {
            match change {
                Pending::Add(key, row) => {
                    if exists(&overlay, &key) {
                        return Err(ContextError::duplicate_key(entity, &key));
                    }
                    overlay.insert(key, Some(row));
                }
                Pending::Update(key, row) => {
                    if !exists(&overlay, &key) {
                        return Err(ContextError::not_found(entity, &key));
                    }
                    overlay.insert(key, Some(row));
                }
                Pending::Remove(key) => {
                    if !exists(&overlay, &key) {
                        return Err(ContextError::not_found(entity, &key));
                    }
                    overlay.insert(key, None);
                }
            }
        }

        for (key, staged) in overlay {
            match staged {
                Some(row) => {
                    rows.insert(key, row);
                }
                None => {
                    rows.remove(&key);
                }
            }
        }

        tracing::trace!(context = %self.id, entity, affected, "in-memory changes saved");
        Ok(affected)
    }

    fn find(&self, key: &Key) -> ContextResult<Option<T>> {
        self.ensure_open()?;
        Ok(self.shared.rows.read().get(key).cloned())
    }

    fn find_all(&self, options: &QueryOptions<T>) -> ContextResult<ResultEnvelope<Vec<T>>> {
        self.ensure_open()?;
        let snapshot: Vec<T> = self.shared.rows.read().values().cloned().collect();
        let (rows, total) = options.apply(snapshot);
        Ok(ResultEnvelope::with_total(rows, total))
    }

    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            let discarded = std::mem::take(&mut *self.pending.lock()).len();
            tracing::trace!(context = %self.id, discarded, "in-memory context disposed");
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl<T: Entity> fmt::Debug for InMemoryContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryContext")
            .field("id", &self.id)
            .field("entity", &T::entity_name())
            .field("pending", &self.pending_len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Opens a fresh [`InMemoryContext`] per [`ContextFactory::create`] call.
pub struct InMemoryContextFactory<T: Entity> {
    db: InMemoryDatabase<T>,
}

impl<T: Entity> InMemoryContextFactory<T> {
    /// Returns the database contexts are opened on.
    #[must_use]
    pub fn database(&self) -> &InMemoryDatabase<T> {
        &self.db
    }
}

impl<T: Entity> ContextFactory<T> for InMemoryContextFactory<T> {
    fn create(&self) -> ContextResult<AsyncAdapter<T>> {
        Ok(AsyncAdapter::sync_only(self.db.context()))
    }
}
