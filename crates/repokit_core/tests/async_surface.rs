//! Async adapter delegation and cancellation.

use repokit_core::{
    AsyncAdapter, CancellationToken, ContextError, ContextState, InMemoryDatabase,
    InterceptionPoint, Interceptor, RepositoryError, RepositoryResult,
};
use repokit_testkit::prelude::*;

#[tokio::test]
async fn native_adapter_never_calls_the_sync_surface() {
    let database = InMemoryDatabase::<Customer>::new().unwrap();
    let calls = CallLog::new();
    let adapter = AsyncAdapter::native(NativeAsyncContext::new(&database, calls.clone()));
    let cancel = CancellationToken::new();

    adapter
        .add_async(&Customer::new(1, "Ada"), &cancel)
        .await
        .unwrap();
    adapter.save_changes_async(&cancel).await.unwrap();

    assert_eq!(
        calls.entries(),
        vec!["context.add_async", "context.save_changes_async"]
    );
    assert!(!calls.contains("context.add"));
}

#[tokio::test]
async fn sync_fallback_runs_the_sync_call_and_keeps_its_error() {
    let database = InMemoryDatabase::<Customer>::new().unwrap();
    let calls = CallLog::new();
    let faults = FaultPlan::new();
    faults.fail("add", ContextError::backend("read only"));
    let adapter = AsyncAdapter::sync_only(
        RecordingContext::new(&database, calls.clone()).with_faults(faults),
    );

    let sync_error = adapter.add(&Customer::new(1, "Ada")).unwrap_err();
    let async_error = adapter
        .add_async(&Customer::new(1, "Ada"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(sync_error, async_error);
    assert_eq!(calls.entries(), vec!["context.add", "context.add"]);
}

#[tokio::test]
async fn sync_fallback_checks_cancellation_at_the_seam() {
    let database = InMemoryDatabase::<Customer>::new().unwrap();
    let calls = CallLog::new();
    let adapter = AsyncAdapter::sync_only(RecordingContext::new(&database, calls.clone()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = adapter
        .add_async(&Customer::new(1, "Ada"), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, ContextError::Cancelled);
    assert!(calls.entries().is_empty());
}

#[tokio::test]
async fn pre_cancelled_operations_touch_nothing() {
    let harness = Harness::<Customer>::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = harness
        .repository
        .add_async(&mut Customer::new(1, "Ada"), &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(harness.factory.created_count(), 0);
    assert!(harness.log.records().is_empty());
    assert_eq!(harness.repository.stats().operations(), 0);
}

struct CancelDuringAdd(CancellationToken);

impl Interceptor<Customer> for CancelDuringAdd {
    fn add_executing(&self, _entity: &mut Customer) -> RepositoryResult<()> {
        self.0.cancel();
        Ok(())
    }
}

async fn cancel_mid_flight(mode: ContextMode) {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let harness = Harness::<Customer>::configure(mode, move |builder, _| {
        builder.with_interceptor(CancelDuringAdd(trigger))
    });

    let err = harness
        .repository
        .add_async(&mut Customer::new(1, "Ada"), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err, RepositoryError::Context(ContextError::Cancelled));
    assert_eq!(harness.log.errors(), vec!["add_async failed: operation cancelled"]);
    assert!(harness.factory.all_disposed());
    assert!(harness.database.is_empty());
    assert_eq!(harness.repository.context_state(), ContextState::NoContext);
}

#[tokio::test]
async fn mid_flight_cancellation_native() {
    cancel_mid_flight(ContextMode::NativeAsync).await;
}

#[tokio::test]
async fn mid_flight_cancellation_sync_fallback() {
    cancel_mid_flight(ContextMode::SyncOnly).await;
}

#[tokio::test]
async fn async_queries_match_sync_queries() {
    let harness = Harness::<Customer>::configure(ContextMode::NativeAsync, |builder, _| builder);
    let cancel = CancellationToken::new();
    let mut customers = vec![
        Customer::in_city(1, "Ada", "Porto"),
        Customer::in_city(2, "Bob", "Faro"),
        Customer::in_city(3, "Cy", "Porto"),
    ];
    harness
        .repository
        .add_range_async(&mut customers, &cancel)
        .await
        .unwrap();

    let all = repokit_core::QueryOptions::new();
    let groups = harness
        .repository
        .group_by_async(&all, |c: &Customer| c.city.clone(), &cancel)
        .await
        .unwrap();
    assert_eq!(groups, harness.repository.group_by(&all, |c: &Customer| c.city.clone()).unwrap());

    let names = harness
        .repository
        .find_projected_async(&customers[1].key(), |c| c.name, &cancel)
        .await
        .unwrap();
    assert_eq!(names.as_deref(), Some("Bob"));

    assert!(harness
        .repository
        .delete_by_key_async(&customers[0].key(), &cancel)
        .await
        .unwrap());
    assert_eq!(harness.repository.count_async(&cancel).await.unwrap(), 2);
    assert!(!harness.calls.contains("context.find_all"));
    assert!(harness.calls.contains("context.find_all_async"));
}

#[test]
fn interception_points_render_as_hook_names() {
    assert_eq!(InterceptionPoint::DeleteExecuted.to_string(), "delete_executed");
}
