//! Context lifecycle, error handling and query behavior of the repository.

use repokit_core::{
    AsyncAdapter, ContextError, ContextState, KeyValue, LogLevel, QueryOptions, Repository,
    RepositoryError, RepositoryOptions, StorageContext,
};
use repokit_testkit::prelude::*;
use std::sync::Arc;

#[test]
fn add_count_delete_scenario() {
    let harness = Harness::<Customer>::new();
    let repository = &harness.repository;
    let mut customer = Customer::new(1, "Ada");

    repository.add(&mut customer).unwrap();
    assert_eq!(repository.count().unwrap(), 1);
    repository.delete(&mut customer).unwrap();
    assert_eq!(repository.count().unwrap(), 0);
    assert_eq!(repository.find(&[KeyValue::Int(1)]).unwrap(), None);
}

#[test]
fn owned_contexts_are_never_reused() {
    let harness = Harness::<Customer>::new();
    let mut customer = Customer::new(1, "Ada");

    harness.repository.add(&mut customer).unwrap();
    harness.repository.find(&customer.key()).unwrap();

    let ids = harness.factory.created_ids();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    assert!(harness.factory.all_disposed());
    assert_eq!(harness.calls.count("context.dispose"), 2);
    assert_eq!(harness.repository.context_state(), ContextState::NoContext);
}

#[test]
fn shared_context_is_used_but_not_disposed() {
    let database = repokit_core::InMemoryDatabase::<Customer>::new().unwrap();
    let calls = CallLog::new();
    let shared = Arc::new(RecordingContext::new(&database, calls.clone()));
    let adapter = AsyncAdapter::from_sync_arc(Arc::clone(&shared));
    let options = RepositoryOptions::builder()
        .with_shared_context(adapter.clone())
        .with_logger_provider(Arc::new(CapturingLoggerProvider::new()))
        .build()
        .unwrap();
    let repository = Repository::new(options).unwrap();

    let mut customer = Customer::new(1, "Ada");
    repository.add(&mut customer).unwrap();
    assert_eq!(repository.find(&customer.key()).unwrap(), Some(customer));

    assert!(!shared.is_disposed());
    assert!(!calls.contains("context.dispose"));
    assert_eq!(
        calls.entries(),
        vec!["context.add", "context.save_changes", "context.find"]
    );
    assert!(repository.options().source().is_shared());
}

#[test]
fn save_failure_is_logged_propagated_and_released() {
    let harness = Harness::<Customer>::new();
    harness
        .factory
        .faults()
        .fail("save_changes", ContextError::backend("disk full"));

    let err = harness
        .repository
        .add(&mut Customer::new(1, "Ada"))
        .unwrap_err();
    assert_eq!(err, RepositoryError::Context(ContextError::backend("disk full")));
    assert_eq!(harness.log.errors(), vec!["add failed: backend error: disk full"]);
    assert!(harness.factory.all_disposed());
    assert_eq!(harness.repository.context_state(), ContextState::NoContext);

    harness.factory.faults().heal("save_changes");
    harness.repository.add(&mut Customer::new(2, "Bob")).unwrap();

    let created = harness.factory.created();
    assert_eq!(created.len(), 2);
    assert!(!created[0].same_context(&created[1]));
    assert_eq!(harness.database.len(), 1);
    assert_eq!(harness.log.errors().len(), 1);
}

#[test]
fn factory_failure_is_an_operation_error() {
    let harness = Harness::<Customer>::new();
    harness
        .factory
        .faults()
        .fail("create", ContextError::backend("pool exhausted"));

    let err = harness.repository.count().unwrap_err();
    assert_eq!(err, RepositoryError::from(ContextError::backend("pool exhausted")));
    assert_eq!(harness.log.errors(), vec!["count failed: backend error: pool exhausted"]);
    assert_eq!(harness.repository.stats().failures(), 1);
    assert_eq!(harness.repository.context_state(), ContextState::NoContext);
}

#[test]
fn argument_errors_skip_logging_and_context() {
    let harness = Harness::<Customer>::new();

    assert_eq!(
        harness.repository.find(&[]).unwrap_err(),
        RepositoryError::argument_null("keys")
    );
    assert!(harness
        .repository
        .exists_key(&[KeyValue::Int(1), KeyValue::Int(2)])
        .unwrap_err()
        .is_argument_error());

    assert!(harness.log.records().is_empty());
    assert!(harness.calls.entries().is_empty());
    assert_eq!(harness.factory.created_count(), 0);
}

#[test]
fn composite_keys_use_one_slice() {
    let harness = Harness::<OrderLine>::new();
    let mut lines = vec![
        OrderLine::new(1, 1, "A-1", 2),
        OrderLine::new(1, 2, "B-7", 1),
        OrderLine::new(2, 1, "A-1", 5),
    ];
    harness.repository.add_range(&mut lines).unwrap();

    let found = harness
        .repository
        .find(&[KeyValue::Int(1), KeyValue::Int(2)])
        .unwrap();
    assert_eq!(found.map(|line| line.sku), Some("B-7".to_string()));

    assert_eq!(
        harness.repository.find(&[KeyValue::Int(1)]).unwrap_err(),
        RepositoryError::KeyArity {
            entity: "OrderLine",
            expected: 2,
            actual: 1
        }
    );
    assert!(harness
        .repository
        .delete_by_key(&[KeyValue::Int(2), KeyValue::Int(1)])
        .unwrap());
    assert_eq!(harness.repository.count().unwrap(), 2);
}

#[test]
fn keyless_entity_is_rejected_at_construction() {
    let options = RepositoryOptions::<Keyless>::builder()
        .with_context_factory(repokit_core::FnContextFactory::new(
            || -> repokit_core::ContextResult<AsyncAdapter<Keyless>> {
                Err(ContextError::backend("never called"))
            },
        ))
        .with_logger_provider(Arc::new(CapturingLoggerProvider::new()))
        .build()
        .unwrap();
    assert!(Repository::new(options).unwrap_err().is_configuration_error());
}

#[test]
fn options_require_a_logger_provider() {
    let database = repokit_core::InMemoryDatabase::<Customer>::new().unwrap();
    let err = RepositoryOptions::builder()
        .with_in_memory_database(&database)
        .build()
        .unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn queries_log_executing_and_executed() {
    let harness = Harness::<Customer>::new();
    harness.repository.exists(&QueryOptions::new()).unwrap();

    assert_eq!(
        harness.log.messages_at(LogLevel::Debug),
        vec!["exists executing", "exists executed"]
    );
    let category = &harness.log.records()[0].category;
    assert_eq!(category, "repokit::Repository<Customer>");
}

#[test]
fn paging_keeps_the_total() {
    let harness = Harness::<Customer>::new();
    let mut customers: Vec<Customer> = (1..=7).map(|id| Customer::new(id, "c")).collect();
    harness.repository.add_range(&mut customers).unwrap();

    let options = QueryOptions::new()
        .with_sort(|a: &Customer, b: &Customer| a.id.cmp(&b.id))
        .with_paging(2, 3);
    let page = harness.repository.find_all_with(&options).unwrap();
    assert_eq!(page.total(), Some(7));
    assert_eq!(page.into_result().iter().map(|c| c.id).collect::<Vec<_>>(), vec![7]);

    let unpaged = harness.repository.find_all_with(&QueryOptions::new()).unwrap();
    assert_eq!(unpaged.total(), Some(unpaged.len()));
    assert_eq!(harness.repository.count_where(&options).unwrap(), 7);
}

#[test]
fn grouping_and_dictionaries() {
    let harness = Harness::<Customer>::new();
    let mut customers = vec![
        Customer::in_city(1, "Ada", "Porto"),
        Customer::in_city(2, "Bob", "Lisbon"),
        Customer::in_city(3, "Cy", "Porto"),
    ];
    harness.repository.add_range(&mut customers).unwrap();
    let all = QueryOptions::new();

    let by_city = harness
        .repository
        .group_by(&all, |c: &Customer| c.city.clone())
        .unwrap();
    assert_eq!(by_city.len(), 2);
    assert_eq!(by_city[0].0, "Porto");
    assert_eq!(by_city[0].1.len(), 2);

    let names = harness
        .repository
        .to_dictionary_projected(&all, |c: &Customer| c.id, |c| c.name)
        .unwrap();
    assert_eq!(names[&2], "Bob");

    let first_porto = harness
        .repository
        .find_where_projected(
            &QueryOptions::new().with_filter(|c: &Customer| c.city == "Porto"),
            |c| c.name,
        )
        .unwrap();
    assert_eq!(first_porto.as_deref(), Some("Ada"));
}
