//! Sample entities and repository helpers.
//!
//! Provides entities covering the key shapes the repository supports and
//! a [`Harness`] bundling a repository with recording collaborators.

use crate::logging::CapturingLoggerProvider;
use crate::recording::{CallLog, ContextMode, RecordingFactory};
use repokit_core::{
    Auditable, Entity, InMemoryDatabase, KeyValue, NullLoggerProvider, Repository,
    RepositoryOptions, RepositoryOptionsBuilder,
};
use std::sync::Arc;
use std::time::SystemTime;

/// An entity with a conventional `id` key and audit timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    /// Primary key.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// City, used for grouping.
    pub city: String,
    /// Set by auditing on add.
    pub created_at: Option<SystemTime>,
    /// Set by auditing on add and update.
    pub modified_at: Option<SystemTime>,
}

impl Customer {
    /// Creates a customer without audit timestamps.
    pub fn new(id: i64, name: &str) -> Self {
        Self::in_city(id, name, "Lisbon")
    }

    /// Creates a customer living in `city`.
    pub fn in_city(id: i64, name: &str, city: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            city: city.to_string(),
            created_at: None,
            modified_at: None,
        }
    }

    /// Returns the key of this customer.
    pub fn key(&self) -> [KeyValue; 1] {
        [KeyValue::Int(self.id)]
    }
}

impl Entity for Customer {
    fn entity_name() -> &'static str {
        "Customer"
    }

    fn fields() -> &'static [&'static str] {
        &["id", "name", "city", "created_at", "modified_at"]
    }

    fn key_value(&self, field: &str) -> Option<KeyValue> {
        match field {
            "id" => Some(KeyValue::Int(self.id)),
            "name" => Some(KeyValue::Text(self.name.clone())),
            "city" => Some(KeyValue::Text(self.city.clone())),
            _ => None,
        }
    }
}

impl Auditable for Customer {
    fn set_created_at(&mut self, at: SystemTime) {
        self.created_at = Some(at);
    }

    fn set_modified_at(&mut self, at: SystemTime) {
        self.modified_at = Some(at);
    }
}

/// An entity with a declared two-part key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    /// First key component.
    pub order_id: i64,
    /// Second key component.
    pub line: i64,
    /// Product code.
    pub sku: String,
    /// Ordered quantity.
    pub quantity: u32,
}

impl OrderLine {
    /// Creates an order line.
    pub fn new(order_id: i64, line: i64, sku: &str, quantity: u32) -> Self {
        Self {
            order_id,
            line,
            sku: sku.to_string(),
            quantity,
        }
    }
}

impl Entity for OrderLine {
    fn entity_name() -> &'static str {
        "OrderLine"
    }

    fn fields() -> &'static [&'static str] {
        &["order_id", "line", "sku", "quantity"]
    }

    fn declared_key() -> Option<&'static [&'static str]> {
        Some(&["order_id", "line"])
    }

    fn key_value(&self, field: &str) -> Option<KeyValue> {
        match field {
            "order_id" => Some(KeyValue::Int(self.order_id)),
            "line" => Some(KeyValue::Int(self.line)),
            "sku" => Some(KeyValue::Text(self.sku.clone())),
            _ => None,
        }
    }
}

/// An entity without any discoverable key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyless {
    /// Free text.
    pub label: String,
}

impl Entity for Keyless {
    fn entity_name() -> &'static str {
        "Keyless"
    }

    fn fields() -> &'static [&'static str] {
        &["label"]
    }

    fn key_value(&self, field: &str) -> Option<KeyValue> {
        (field == "label").then(|| KeyValue::Text(self.label.clone()))
    }
}

/// Creates a repository over a fresh in-memory database, without logging.
pub fn memory_repository<T: Entity>() -> (InMemoryDatabase<T>, Repository<T>) {
    let database = InMemoryDatabase::new().expect("entity has no primary key");
    let options = RepositoryOptions::builder()
        .with_in_memory_database(&database)
        .with_logger_provider(Arc::new(NullLoggerProvider))
        .build()
        .expect("valid options");
    let repository = Repository::new(options).expect("valid repository");
    (database, repository)
}

/// A repository wired to recording collaborators.
pub struct Harness<T: Entity> {
    /// Committed rows.
    pub database: InMemoryDatabase<T>,
    /// The factory the repository creates contexts from.
    pub factory: RecordingFactory<T>,
    /// Every captured log entry.
    pub log: CapturingLoggerProvider,
    /// Calls made on contexts and recording interceptors.
    pub calls: CallLog,
    /// The repository under test.
    pub repository: Repository<T>,
}

impl<T: Entity> Harness<T> {
    /// Creates a harness with sync-only contexts and default options.
    pub fn new() -> Self {
        Self::configure(ContextMode::SyncOnly, |builder, _| builder)
    }

    /// Creates a harness, letting `configure` adjust the options builder.
    ///
    /// The context factory and logger provider are set before `configure`
    /// runs. `configure` also receives the harness call log, for recording
    /// interceptors.
    pub fn configure<F>(mode: ContextMode, configure: F) -> Self
    where
        F: FnOnce(RepositoryOptionsBuilder<T>, &CallLog) -> RepositoryOptionsBuilder<T>,
    {
        let database = InMemoryDatabase::new().expect("entity has no primary key");
        let calls = CallLog::new();
        let factory = RecordingFactory::new(database.clone(), mode).with_calls(calls.clone());
        let log = CapturingLoggerProvider::new();
        let builder = RepositoryOptions::builder()
            .with_context_factory(factory.clone())
            .with_logger_provider(Arc::new(log.clone()));
        let options = configure(builder, &calls).build().expect("valid options");
        let repository = Repository::new(options).expect("valid repository");

        Self {
            database,
            factory,
            log,
            calls,
            repository,
        }
    }
}

impl<T: Entity> Default for Harness<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repokit_core::{Conventions, KeySchema};

    #[test]
    fn key_shapes() {
        let conventions = Conventions::new();
        assert_eq!(
            KeySchema::resolve::<Customer>(&conventions).unwrap().fields(),
            &["id"]
        );
        assert_eq!(
            KeySchema::resolve::<OrderLine>(&conventions).unwrap().arity(),
            2
        );
        assert!(KeySchema::resolve::<Keyless>(&conventions).is_none());
    }

    #[test]
    fn memory_repository_round_trip() {
        let (database, repository) = memory_repository::<Customer>();
        let mut customer = Customer::new(7, "Ada");
        repository.add(&mut customer).unwrap();
        assert_eq!(database.len(), 1);
        assert_eq!(repository.find(&customer.key()).unwrap(), Some(customer));
    }
}
