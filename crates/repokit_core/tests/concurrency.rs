//! Detection of concurrent misuse of one repository.

use parking_lot::Mutex;
use repokit_core::{
    ContextState, InMemoryDatabase, Interceptor, LogLevel, Repository, RepositoryOptions,
    RepositoryResult,
};
use repokit_testkit::prelude::*;
use std::sync::{Arc, OnceLock, Weak};
use std::thread;

#[test]
fn overlapping_calls_are_detected_and_share_one_context() {
    let database = InMemoryDatabase::<Customer>::new().unwrap();
    let gate = Gate::closed();
    let factory = RecordingFactory::new(database.clone(), ContextMode::SyncOnly)
        .with_gate("add", gate.clone());
    let log = CapturingLoggerProvider::new();
    let options = RepositoryOptions::builder()
        .with_context_factory(factory.clone())
        .with_logger_provider(Arc::new(log.clone()))
        .build()
        .unwrap();
    let repository = Repository::new(options).unwrap();

    let count = thread::scope(|scope| {
        let writer = scope.spawn(|| repository.add(&mut Customer::new(1, "Ada")));
        gate.wait_for(1);
        assert_eq!(repository.context_state(), ContextState::ContextActive);

        let count = repository.count();
        gate.open();
        writer.join().unwrap().unwrap();
        count
    });

    assert_eq!(count.unwrap(), 0);
    assert_eq!(repository.stats().overlapping_scopes(), 1);
    assert_eq!(factory.created_count(), 1);
    assert!(factory.all_disposed());
    assert_eq!(
        log.messages_at(LogLevel::Warn),
        vec!["count started while another operation holds the context"]
    );
    assert_eq!(database.len(), 1);
    assert_eq!(repository.context_state(), ContextState::NoContext);
}

#[test]
fn sequential_calls_never_overlap() {
    let harness = Harness::<Customer>::new();
    for id in 0..10 {
        harness.repository.add(&mut Customer::new(id, "c")).unwrap();
    }
    assert_eq!(harness.repository.stats().overlapping_scopes(), 0);
    assert_eq!(harness.factory.created_count(), 10);
}

/// Counts customers from inside the `add_executed` hook.
#[derive(Clone, Default)]
struct CountAfterAdd {
    repository: Arc<OnceLock<Weak<Repository<Customer>>>>,
    seen: Arc<Mutex<Vec<usize>>>,
}

impl Interceptor<Customer> for CountAfterAdd {
    fn add_executed(&self, _entity: &mut Customer) -> RepositoryResult<()> {
        if let Some(repository) = self.repository.get().and_then(Weak::upgrade) {
            let count = repository.count()?;
            self.seen.lock().push(count);
        }
        Ok(())
    }
}

#[test]
fn calls_nested_on_the_same_thread_are_not_overlaps() {
    let database = InMemoryDatabase::<Customer>::new().unwrap();
    let factory = RecordingFactory::new(database, ContextMode::SyncOnly);
    let log = CapturingLoggerProvider::new();
    let hook = CountAfterAdd::default();
    let options = RepositoryOptions::builder()
        .with_context_factory(factory.clone())
        .with_logger_provider(Arc::new(log.clone()))
        .with_interceptor(hook.clone())
        .build()
        .unwrap();
    let repository = Arc::new(Repository::new(options).unwrap());
    hook.repository.set(Arc::downgrade(&repository)).unwrap();

    repository.add(&mut Customer::new(1, "Ada")).unwrap();

    assert_eq!(*hook.seen.lock(), vec![1]);
    assert_eq!(repository.stats().nested_scopes(), 1);
    assert_eq!(repository.stats().overlapping_scopes(), 0);
    assert!(log.messages_at(LogLevel::Warn).is_empty());
    assert_eq!(factory.created_count(), 1);
    assert!(factory.all_disposed());
    assert_eq!(repository.context_state(), ContextState::NoContext);
}
