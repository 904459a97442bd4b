//! Primary-key discovery conventions.

use crate::entity::{Entity, Key};
use crate::error::{ContextError, ContextResult};
use std::fmt;
use std::sync::Arc;

/// A custom key discovery rule.
///
/// Receives the entity name and its declared fields, returns the key
/// fields (empty if the rule does not apply).
pub type KeyRule =
    Arc<dyn Fn(&'static str, &'static [&'static str]) -> Vec<&'static str> + Send + Sync>;

/// Rules for discovering an entity's primary key.
///
/// Resolution order:
/// 1. [`Entity::declared_key`], if present and non-empty
/// 2. custom rules, in registration order; the first non-empty answer wins
/// 3. built-in rules: a field named `id`, then `{entity}id`, then
///    `{entity}_id` (all case-insensitive)
#[derive(Clone, Default)]
pub struct Conventions {
    rules: Vec<KeyRule>,
}

impl Conventions {
    /// Creates conventions with only the built-in rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom key discovery rule.
    #[must_use]
    pub fn with_key_rule<F>(mut self, rule: F) -> Self
    where
        F: Fn(&'static str, &'static [&'static str]) -> Vec<&'static str> + Send + Sync + 'static,
    {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Returns the number of custom rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Discovers the primary key fields of `T`.
    ///
    /// Returns an empty vector if no key can be discovered.
    #[must_use]
    pub fn primary_key<T: Entity>(&self) -> Vec<&'static str> {
        if let Some(declared) = T::declared_key() {
            if !declared.is_empty() {
                return declared.to_vec();
            }
        }

        let name = T::entity_name();
        let fields = T::fields();

        for rule in &self.rules {
            let key = rule(name, fields);
            if !key.is_empty() {
                return key;
            }
        }

        let candidates = [
            "id".to_string(),
            format!("{name}id"),
            format!("{name}_id"),
        ];
        candidates
            .iter()
            .find_map(|candidate| {
                fields
                    .iter()
                    .find(|field| field.eq_ignore_ascii_case(candidate))
            })
            .map(|field| vec![*field])
            .unwrap_or_default()
    }
}

impl fmt::Debug for Conventions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conventions")
            .field("custom_rules", &self.rules.len())
            .finish()
    }
}

/// The resolved primary key of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    entity: &'static str,
    fields: Vec<&'static str>,
}

impl KeySchema {
    /// Resolves the key schema of `T`.
    ///
    /// Returns `None` if the entity type has no discoverable primary key.
    #[must_use]
    pub fn resolve<T: Entity>(conventions: &Conventions) -> Option<Self> {
        let fields = conventions.primary_key::<T>();
        if fields.is_empty() {
            return None;
        }
        Some(Self {
            entity: T::entity_name(),
            fields,
        })
    }

    /// Returns the entity name.
    #[must_use]
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Returns the key fields, in key order.
    #[must_use]
    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    /// Returns the number of key components.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Extracts the key of an entity.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::MissingKeyValue`] if the entity has no
    /// value for one of the key fields.
    pub fn key_of<T: Entity>(&self, entity: &T) -> ContextResult<Key> {
        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = entity
                .key_value(field)
                .ok_or(ContextError::MissingKeyValue {
                    entity: self.entity,
                    field: *field,
                })?;
            values.push(value);
        }
        Ok(Key::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::KeyValue;

    #[derive(Clone)]
    struct Plain {
        id: i64,
    }

    impl Entity for Plain {
        fn entity_name() -> &'static str {
            "Plain"
        }
        fn fields() -> &'static [&'static str] {
            &["Id", "label"]
        }
        fn key_value(&self, field: &str) -> Option<KeyValue> {
            (field == "Id").then(|| KeyValue::Int(self.id))
        }
    }

    #[derive(Clone)]
    struct Named;

    impl Entity for Named {
        fn entity_name() -> &'static str {
            "Invoice"
        }
        fn fields() -> &'static [&'static str] {
            &["number", "invoice_id"]
        }
        fn key_value(&self, _field: &str) -> Option<KeyValue> {
            None
        }
    }

    #[derive(Clone)]
    struct Declared;

    impl Entity for Declared {
        fn entity_name() -> &'static str {
            "Line"
        }
        fn fields() -> &'static [&'static str] {
            &["id", "order_id", "line_no"]
        }
        fn declared_key() -> Option<&'static [&'static str]> {
            Some(&["order_id", "line_no"])
        }
        fn key_value(&self, _field: &str) -> Option<KeyValue> {
            None
        }
    }

    #[derive(Clone)]
    struct Keyless;

    impl Entity for Keyless {
        fn entity_name() -> &'static str {
            "Keyless"
        }
        fn fields() -> &'static [&'static str] {
            &["name"]
        }
        fn key_value(&self, _field: &str) -> Option<KeyValue> {
            None
        }
    }

    #[test]
    fn id_field_is_case_insensitive() {
        assert_eq!(Conventions::new().primary_key::<Plain>(), vec!["Id"]);
    }

    #[test]
    fn entity_prefixed_id() {
        assert_eq!(Conventions::new().primary_key::<Named>(), vec!["invoice_id"]);
    }

    #[test]
    fn declared_key_wins() {
        assert_eq!(
            Conventions::new().primary_key::<Declared>(),
            vec!["order_id", "line_no"]
        );
    }

    #[test]
    fn custom_rule_runs_before_builtins() {
        let conventions = Conventions::new().with_key_rule(|name, _| {
            if name == "Invoice" {
                vec!["number"]
            } else {
                Vec::new()
            }
        });
        assert_eq!(conventions.primary_key::<Named>(), vec!["number"]);
        assert_eq!(conventions.primary_key::<Plain>(), vec!["Id"]);
    }

    #[test]
    fn keyless_resolves_to_none() {
        assert!(KeySchema::resolve::<Keyless>(&Conventions::new()).is_none());
    }

    #[test]
    fn key_of_extracts_values() {
        let schema = KeySchema::resolve::<Plain>(&Conventions::new()).unwrap();
        assert_eq!(schema.arity(), 1);
        let key = schema.key_of(&Plain { id: 42 }).unwrap();
        assert_eq!(key.values(), &[KeyValue::Int(42)]);
    }

    #[test]
    fn key_of_reports_missing_values() {
        let schema = KeySchema::resolve::<Declared>(&Conventions::new()).unwrap();
        let err = schema.key_of(&Declared).unwrap_err();
        assert_eq!(
            err,
            ContextError::MissingKeyValue {
                entity: "Line",
                field: "order_id"
            }
        );
    }
}
