//! Entity trait and key values.

use std::fmt;
use uuid::Uuid;

/// A type that can be stored through a storage context.
///
/// Entities describe their fields so that primary keys can be discovered
/// by [`Conventions`](crate::Conventions) instead of being hard-wired into
/// the repository.
///
/// # Example
///
/// ```rust
/// use repokit_context::{Entity, KeyValue};
///
/// #[derive(Clone)]
/// struct Customer {
///     id: i64,
///     name: String,
/// }
///
/// impl Entity for Customer {
///     fn entity_name() -> &'static str {
///         "Customer"
///     }
///
///     fn fields() -> &'static [&'static str] {
///         &["id", "name"]
///     }
///
///     fn key_value(&self, field: &str) -> Option<KeyValue> {
///         match field {
///             "id" => Some(KeyValue::Int(self.id)),
///             "name" => Some(KeyValue::Text(self.name.clone())),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Entity: Clone + Send + Sync + 'static {
    /// Short type name used for key discovery, errors and log categories.
    fn entity_name() -> &'static str;

    /// Declared field names, in declaration order.
    fn fields() -> &'static [&'static str];

    /// Fields explicitly declared as the primary key.
    ///
    /// When this returns `Some`, conventions are not consulted.
    fn declared_key() -> Option<&'static [&'static str]> {
        None
    }

    /// Returns the value of a key-capable field, or `None` if the field is
    /// unknown or currently unset.
    fn key_value(&self, field: &str) -> Option<KeyValue>;
}

/// A single component of a primary key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    /// Integer key component.
    Int(i64),
    /// Text key component.
    Text(String),
    /// UUID key component.
    Uuid(Uuid),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(v) => write!(f, "{v}"),
            KeyValue::Text(v) => write!(f, "{v:?}"),
            KeyValue::Uuid(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        KeyValue::Int(value)
    }
}

impl From<i32> for KeyValue {
    fn from(value: i32) -> Self {
        KeyValue::Int(i64::from(value))
    }
}

impl From<u32> for KeyValue {
    fn from(value: u32) -> Self {
        KeyValue::Int(i64::from(value))
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        KeyValue::Text(value.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        KeyValue::Text(value)
    }
}

impl From<Uuid> for KeyValue {
    fn from(value: Uuid) -> Self {
        KeyValue::Uuid(value)
    }
}

/// An ordered primary key of one or more components.
///
/// Single, two-part and three-part keys are all represented by the same
/// type; the arity is checked against the entity's
/// [`KeySchema`](crate::KeySchema).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Vec<KeyValue>);

impl Key {
    /// Creates a key from its components.
    #[must_use]
    pub fn new(values: Vec<KeyValue>) -> Self {
        Self(values)
    }

    /// Creates a key from a slice of components.
    #[must_use]
    pub fn from_slice(values: &[KeyValue]) -> Self {
        Self(values.to_vec())
    }

    /// Returns the key components.
    #[must_use]
    pub fn values(&self) -> &[KeyValue] {
        &self.0
    }

    /// Returns the number of components.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.0.len()
    }
}

impl From<KeyValue> for Key {
    fn from(value: KeyValue) -> Self {
        Self(vec![value])
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display() {
        let key = Key::new(vec![KeyValue::Int(7), KeyValue::from("b")]);
        assert_eq!(key.to_string(), "(7, \"b\")");
        assert_eq!(key.arity(), 2);
    }

    #[test]
    fn key_ordering_is_componentwise() {
        let a = Key::new(vec![KeyValue::Int(1), KeyValue::Int(9)]);
        let b = Key::new(vec![KeyValue::Int(2), KeyValue::Int(0)]);
        assert!(a < b);
    }

    #[test]
    fn conversions() {
        assert_eq!(KeyValue::from(3i32), KeyValue::Int(3));
        assert_eq!(KeyValue::from("x"), KeyValue::Text("x".into()));
        let id = Uuid::new_v4();
        assert_eq!(Key::from(KeyValue::from(id)).values(), &[KeyValue::Uuid(id)]);
    }
}
