//! Error types for repository operations.

use repokit_context::ContextError;
use thiserror::Error;

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors surfaced by a [`Repository`](crate::Repository).
///
/// Three families exist:
/// - configuration errors, raised while building options or constructing a
///   repository, never at operation time
/// - argument errors, raised before any backend work and not logged
/// - operation errors, raised by the storage context or an interceptor,
///   logged once at error level and returned unchanged
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// Error raised by the storage context, passed through as-is.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// A required argument was missing.
    #[error("argument `{name}` is required")]
    ArgumentNull {
        /// Name of the missing argument.
        name: &'static str,
    },

    /// A key with the wrong number of components was supplied.
    #[error("{entity} key expects {expected} component(s), got {actual}")]
    KeyArity {
        /// Entity type name.
        entity: &'static str,
        /// Number of key components the entity declares.
        expected: usize,
        /// Number of components supplied.
        actual: usize,
    },

    /// The repository or its options are misconfigured.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// An interceptor rejected or failed the operation.
    #[error("interceptor {interceptor} failed: {message}")]
    Interceptor {
        /// Name of the failing interceptor.
        interceptor: String,
        /// Failure description.
        message: String,
    },
}

impl RepositoryError {
    /// Creates an argument-null error.
    pub fn argument_null(name: &'static str) -> Self {
        Self::ArgumentNull { name }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an interceptor error.
    pub fn interceptor(interceptor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Interceptor {
            interceptor: interceptor.into(),
            message: message.into(),
        }
    }

    /// Returns true for caller-misuse errors (missing or malformed arguments).
    #[must_use]
    pub fn is_argument_error(&self) -> bool {
        matches!(self, Self::ArgumentNull { .. } | Self::KeyArity { .. })
    }

    /// Returns true for configuration errors.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Returns true if the operation was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Context(err) if err.is_cancelled())
    }
}
