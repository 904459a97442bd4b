//! Error types for storage context operations.

use thiserror::Error;

/// Result type for storage context operations.
pub type ContextResult<T> = Result<T, ContextError>;

/// Errors raised by a storage context.
///
/// These are backend faults. The repository layer never translates them:
/// whatever a context returns is what the caller eventually sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The context has been disposed and accepts no further calls.
    #[error("storage context is disposed")]
    Disposed,

    /// The operation was cancelled before or during backend dispatch.
    #[error("operation cancelled")]
    Cancelled,

    /// An entity with the same key already exists.
    #[error("duplicate key {key} for {entity}")]
    DuplicateKey {
        /// Entity type name.
        entity: &'static str,
        /// Rendered key.
        key: String,
    },

    /// The targeted entity does not exist in the store.
    #[error("{entity} with key {key} not found")]
    NotFound {
        /// Entity type name.
        entity: &'static str,
        /// Rendered key.
        key: String,
    },

    /// The entity does not carry a value for one of its key fields.
    #[error("{entity} has no value for key field `{field}`")]
    MissingKeyValue {
        /// Entity type name.
        entity: &'static str,
        /// The key field without a value.
        field: &'static str,
    },

    /// The entity type has no discoverable primary key.
    #[error("{entity} has no discoverable primary key")]
    NoPrimaryKey {
        /// Entity type name.
        entity: &'static str,
    },

    /// A backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl ContextError {
    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(entity: &'static str, key: impl ToString) -> Self {
        Self::DuplicateKey {
            entity,
            key: key.to_string(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Returns true if this error reports a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            ContextError::duplicate_key("Customer", "(1)").to_string(),
            "duplicate key (1) for Customer"
        );
        assert_eq!(
            ContextError::backend("connection reset").to_string(),
            "backend error: connection reset"
        );
        assert_eq!(ContextError::Disposed.to_string(), "storage context is disposed");
    }

    #[test]
    fn cancelled_classification() {
        assert!(ContextError::Cancelled.is_cancelled());
        assert!(!ContextError::Disposed.is_cancelled());
    }
}
