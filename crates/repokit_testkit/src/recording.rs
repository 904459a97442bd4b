//! Recording collaborators.
//!
//! Contexts, factories and interceptors in this module append to a shared
//! [`CallLog`], so tests can assert the exact order in which the
//! repository drives them. Failures and blocking are injected through a
//! [`FaultPlan`] and a [`Gate`].

use async_trait::async_trait;
use parking_lot::{Condvar, Mutex};
use repokit_core::{
    AsyncAdapter, AsyncStorageContext, ContextError, ContextFactory, ContextResult, Entity,
    InMemoryContext, InMemoryDatabase, InterceptionPoint, Interceptor, Key, QueryOptions,
    RepositoryError, RepositoryResult, ResultEnvelope, StorageContext,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// An ordered, shareable log of calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Returns a copy of every entry.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Returns true if `entry` was recorded.
    pub fn contains(&self, entry: &str) -> bool {
        self.entries.lock().iter().any(|e| e == entry)
    }

    /// Number of times `entry` was recorded.
    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Errors to inject, keyed by context method name (`add`, `save_changes`,
/// `find_all`, ...) or `create` for the factory.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    faults: Arc<Mutex<HashMap<&'static str, ContextError>>>,
}

impl FaultPlan {
    /// Creates a plan without faults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `method` fail with `error`.
    pub fn fail(&self, method: &'static str, error: ContextError) {
        self.faults.lock().insert(method, error);
    }

    /// Stops failing `method`.
    pub fn heal(&self, method: &'static str) {
        self.faults.lock().remove(method);
    }

    /// Returns the injected error for `method`, if any.
    pub fn check(&self, method: &str) -> ContextResult<()> {
        match self.faults.lock().get(method) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
struct GateState {
    closed: bool,
    waiting: usize,
}

/// Blocks callers until opened.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    inner: Arc<(Mutex<GateState>, Condvar)>,
}

impl Gate {
    /// Creates a closed gate.
    pub fn closed() -> Self {
        let gate = Self::default();
        gate.inner.0.lock().closed = true;
        gate
    }

    /// Blocks until the gate is open.
    pub fn pass(&self) {
        let (state, signal) = &*self.inner;
        let mut state = state.lock();
        state.waiting += 1;
        signal.notify_all();
        while state.closed {
            signal.wait(&mut state);
        }
        state.waiting -= 1;
    }

    /// Blocks until at least `count` callers are waiting at the gate.
    pub fn wait_for(&self, count: usize) {
        let (state, signal) = &*self.inner;
        let mut state = state.lock();
        while state.waiting < count {
            signal.wait(&mut state);
        }
    }

    /// Opens the gate and releases every waiter.
    pub fn open(&self) {
        let (state, signal) = &*self.inner;
        state.lock().closed = false;
        signal.notify_all();
    }
}

/// Whether created contexts implement the native async surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMode {
    /// Only [`StorageContext`]; async calls go through the adapter fallback.
    SyncOnly,
    /// [`AsyncStorageContext`] as well.
    NativeAsync,
}

struct Recorder<T: Entity> {
    inner: InMemoryContext<T>,
    calls: CallLog,
    faults: FaultPlan,
    gate: Option<(&'static str, Gate)>,
}

impl<T: Entity> Recorder<T> {
    fn new(database: &InMemoryDatabase<T>, calls: CallLog) -> Self {
        Self {
            inner: database.context(),
            calls,
            faults: FaultPlan::new(),
            gate: None,
        }
    }

    fn enter(&self, label: &str, method: &'static str) -> ContextResult<()> {
        self.calls.push(format!("context.{label}"));
        if let Some((gated, gate)) = &self.gate {
            if *gated == method {
                gate.pass();
            }
        }
        self.faults.check(method)
    }

    fn enter_async(
        &self,
        label: &str,
        method: &'static str,
        cancel: &CancellationToken,
    ) -> ContextResult<()> {
        self.enter(label, method)?;
        if cancel.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        Ok(())
    }
}

macro_rules! record_sync_surface {
    ($context:ident) => {
        impl<T: Entity> StorageContext<T> for $context<T> {
            fn add(&self, entity: &T) -> ContextResult<()> {
                self.recorder.enter("add", "add")?;
                self.recorder.inner.add(entity)
            }

            fn update(&self, entity: &T) -> ContextResult<()> {
                self.recorder.enter("update", "update")?;
                self.recorder.inner.update(entity)
            }

            fn remove(&self, entity: &T) -> ContextResult<()> {
                self.recorder.enter("remove", "remove")?;
                self.recorder.inner.remove(entity)
            }

            fn save_changes(&self) -> ContextResult<usize> {
                self.recorder.enter("save_changes", "save_changes")?;
                self.recorder.inner.save_changes()
            }

            fn find(&self, key: &Key) -> ContextResult<Option<T>> {
                self.recorder.enter("find", "find")?;
                self.recorder.inner.find(key)
            }

            fn find_all(&self, options: &QueryOptions<T>) -> ContextResult<ResultEnvelope<Vec<T>>> {
                self.recorder.enter("find_all", "find_all")?;
                self.recorder.inner.find_all(options)
            }

            fn dispose(&self) {
                self.recorder.calls.push("context.dispose");
                self.recorder.inner.dispose();
            }

            fn is_disposed(&self) -> bool {
                self.recorder.inner.is_disposed()
            }
        }

        impl<T: Entity> $context<T> {
            /// Creates a context over `database`, recording into `calls`.
            pub fn new(database: &InMemoryDatabase<T>, calls: CallLog) -> Self {
                Self {
                    recorder: Recorder::new(database, calls),
                }
            }

            /// Injects faults from `faults`.
            #[must_use]
            pub fn with_faults(mut self, faults: FaultPlan) -> Self {
                self.recorder.faults = faults;
                self
            }

            /// Blocks calls of `method` at `gate`.
            #[must_use]
            pub fn with_gate(mut self, method: &'static str, gate: Gate) -> Self {
                self.recorder.gate = Some((method, gate));
                self
            }

            /// Identifier of the underlying in-memory context.
            pub fn id(&self) -> Uuid {
                self.recorder.inner.id()
            }

            /// Number of tracked, unsaved changes.
            pub fn pending_len(&self) -> usize {
                self.recorder.inner.pending_len()
            }
        }
    };
}

/// A sync-only context that records every call.
pub struct RecordingContext<T: Entity> {
    recorder: Recorder<T>,
}

record_sync_surface!(RecordingContext);

/// A context with a native async surface that records every call.
///
/// Async methods record `context.<method>_async` and never go through the
/// synchronous methods. They honour cancellation after recording.
pub struct NativeAsyncContext<T: Entity> {
    recorder: Recorder<T>,
}

record_sync_surface!(NativeAsyncContext);

#[async_trait]
impl<T: Entity> AsyncStorageContext<T> for NativeAsyncContext<T> {
    async fn add_async(&self, entity: &T, cancel: &CancellationToken) -> ContextResult<()> {
        self.recorder.enter_async("add_async", "add", cancel)?;
        self.recorder.inner.add(entity)
    }

    async fn update_async(&self, entity: &T, cancel: &CancellationToken) -> ContextResult<()> {
        self.recorder.enter_async("update_async", "update", cancel)?;
        self.recorder.inner.update(entity)
    }

    async fn remove_async(&self, entity: &T, cancel: &CancellationToken) -> ContextResult<()> {
        self.recorder.enter_async("remove_async", "remove", cancel)?;
        self.recorder.inner.remove(entity)
    }

    async fn save_changes_async(&self, cancel: &CancellationToken) -> ContextResult<usize> {
        self.recorder
            .enter_async("save_changes_async", "save_changes", cancel)?;
        self.recorder.inner.save_changes()
    }

    async fn find_async(&self, key: &Key, cancel: &CancellationToken) -> ContextResult<Option<T>> {
        self.recorder.enter_async("find_async", "find", cancel)?;
        self.recorder.inner.find(key)
    }

    async fn find_all_async(
        &self,
        options: &QueryOptions<T>,
        cancel: &CancellationToken,
    ) -> ContextResult<ResultEnvelope<Vec<T>>> {
        self.recorder.enter_async("find_all_async", "find_all", cancel)?;
        self.recorder.inner.find_all(options)
    }
}

/// A factory producing recording contexts over one database.
///
/// Clones share the call log, the fault plan and the list of created
/// contexts.
#[derive(Clone)]
pub struct RecordingFactory<T: Entity> {
    database: InMemoryDatabase<T>,
    mode: ContextMode,
    calls: CallLog,
    faults: FaultPlan,
    gate: Option<(&'static str, Gate)>,
    created: Arc<Mutex<Vec<(Uuid, AsyncAdapter<T>)>>>,
}

impl<T: Entity> RecordingFactory<T> {
    /// Creates a factory over `database`.
    pub fn new(database: InMemoryDatabase<T>, mode: ContextMode) -> Self {
        Self {
            database,
            mode,
            calls: CallLog::new(),
            faults: FaultPlan::new(),
            gate: None,
            created: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Records into `calls`.
    #[must_use]
    pub fn with_calls(mut self, calls: CallLog) -> Self {
        self.calls = calls;
        self
    }

    /// Blocks calls of `method` on every created context at `gate`.
    #[must_use]
    pub fn with_gate(mut self, method: &'static str, gate: Gate) -> Self {
        self.gate = Some((method, gate));
        self
    }

    /// Returns the fault plan shared by every created context.
    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }

    /// Returns the call log.
    pub fn calls(&self) -> &CallLog {
        &self.calls
    }

    /// Number of contexts created so far.
    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }

    /// Identifiers of created contexts, in creation order.
    pub fn created_ids(&self) -> Vec<Uuid> {
        self.created.lock().iter().map(|(id, _)| *id).collect()
    }

    /// The created contexts, in creation order.
    pub fn created(&self) -> Vec<AsyncAdapter<T>> {
        self.created
            .lock()
            .iter()
            .map(|(_, adapter)| adapter.clone())
            .collect()
    }

    /// Returns true if every created context has been disposed.
    pub fn all_disposed(&self) -> bool {
        self.created
            .lock()
            .iter()
            .all(|(_, adapter)| adapter.is_disposed())
    }

    fn build(&self) -> (Uuid, AsyncAdapter<T>) {
        let mut recorder = Recorder::new(&self.database, self.calls.clone());
        recorder.faults = self.faults.clone();
        recorder.gate = self.gate.clone();
        let id = recorder.inner.id();
        let adapter = match self.mode {
            ContextMode::SyncOnly => AsyncAdapter::sync_only(RecordingContext { recorder }),
            ContextMode::NativeAsync => AsyncAdapter::native(NativeAsyncContext { recorder }),
        };
        (id, adapter)
    }
}

impl<T: Entity> ContextFactory<T> for RecordingFactory<T> {
    fn create(&self) -> ContextResult<AsyncAdapter<T>> {
        self.calls.push("factory.create");
        self.faults.check("create")?;
        let (id, adapter) = self.build();
        self.created.lock().push((id, adapter.clone()));
        Ok(adapter)
    }
}

/// An interceptor recording every hook as `<name>.<hook>`.
///
/// The const parameter makes distinct interceptor types, so several can be
/// registered on one repository.
#[derive(Debug, Clone)]
pub struct RecordingInterceptor<const N: usize> {
    name: String,
    calls: CallLog,
}

impl<const N: usize> RecordingInterceptor<N> {
    /// Creates an interceptor named `name`.
    pub fn new(name: &str, calls: CallLog) -> Self {
        Self {
            name: name.to_string(),
            calls,
        }
    }

    fn record(&self, point: InterceptionPoint) -> RepositoryResult<()> {
        self.calls.push(format!("{}.{point}", self.name));
        Ok(())
    }
}

impl<T: Entity, const N: usize> Interceptor<T> for RecordingInterceptor<N> {
    fn add_executing(&self, _entity: &mut T) -> RepositoryResult<()> {
        self.record(InterceptionPoint::AddExecuting)
    }

    fn add_executed(&self, _entity: &mut T) -> RepositoryResult<()> {
        self.record(InterceptionPoint::AddExecuted)
    }

    fn update_executing(&self, _entity: &mut T) -> RepositoryResult<()> {
        self.record(InterceptionPoint::UpdateExecuting)
    }

    fn update_executed(&self, _entity: &mut T) -> RepositoryResult<()> {
        self.record(InterceptionPoint::UpdateExecuted)
    }

    fn delete_executing(&self, _entity: &mut T) -> RepositoryResult<()> {
        self.record(InterceptionPoint::DeleteExecuting)
    }

    fn delete_executed(&self, _entity: &mut T) -> RepositoryResult<()> {
        self.record(InterceptionPoint::DeleteExecuted)
    }
}

/// An interceptor failing at one interception point.
#[derive(Debug, Clone)]
pub struct FailingInterceptor {
    point: InterceptionPoint,
    message: String,
}

impl FailingInterceptor {
    /// Fails at `point` with `message`.
    pub fn at(point: InterceptionPoint, message: &str) -> Self {
        Self {
            point,
            message: message.to_string(),
        }
    }

    /// The error this interceptor returns.
    pub fn error(&self) -> RepositoryError {
        RepositoryError::interceptor("FailingInterceptor", self.message.clone())
    }

    fn check(&self, point: InterceptionPoint) -> RepositoryResult<()> {
        if point == self.point {
            Err(self.error())
        } else {
            Ok(())
        }
    }
}

impl<T: Entity> Interceptor<T> for FailingInterceptor {
    fn add_executing(&self, _entity: &mut T) -> RepositoryResult<()> {
        self.check(InterceptionPoint::AddExecuting)
    }

    fn add_executed(&self, _entity: &mut T) -> RepositoryResult<()> {
        self.check(InterceptionPoint::AddExecuted)
    }

    fn update_executing(&self, _entity: &mut T) -> RepositoryResult<()> {
        self.check(InterceptionPoint::UpdateExecuting)
    }

    fn update_executed(&self, _entity: &mut T) -> RepositoryResult<()> {
        self.check(InterceptionPoint::UpdateExecuted)
    }

    fn delete_executing(&self, _entity: &mut T) -> RepositoryResult<()> {
        self.check(InterceptionPoint::DeleteExecuting)
    }

    fn delete_executed(&self, _entity: &mut T) -> RepositoryResult<()> {
        self.check(InterceptionPoint::DeleteExecuted)
    }
}
