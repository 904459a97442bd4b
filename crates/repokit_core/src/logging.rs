//! Logger provider abstraction.
//!
//! The repository never logs through a global; it asks the configured
//! [`LoggerProvider`] for a category logger once, at construction.
//! [`TracingLoggerProvider`] forwards to `tracing`, [`NullLoggerProvider`]
//! discards everything.

use std::fmt;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Very verbose diagnostics.
    Trace,
    /// Operation-level diagnostics.
    Debug,
    /// Informational messages.
    Info,
    /// Suspicious but recoverable conditions.
    Warn,
    /// Failed operations.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// A category logger.
///
/// When `is_enabled(level)` is false, `log(level, ..)` must have no
/// observable effect.
pub trait Logger: Send + Sync {
    /// Returns true if entries at `level` are recorded.
    fn is_enabled(&self, level: LogLevel) -> bool;

    /// Records an entry.
    fn log(&self, level: LogLevel, message: &str);
}

/// Supplies category loggers.
pub trait LoggerProvider: Send + Sync {
    /// Creates a logger for `category`.
    fn create(&self, category: &str) -> Arc<dyn Logger>;
}

/// A logger that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn is_enabled(&self, _level: LogLevel) -> bool {
        false
    }

    fn log(&self, _level: LogLevel, _message: &str) {}
}

/// Provides [`NullLogger`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLoggerProvider;

impl LoggerProvider for NullLoggerProvider {
    fn create(&self, _category: &str) -> Arc<dyn Logger> {
        Arc::new(NullLogger)
    }
}

/// A logger that emits `tracing` events tagged with its category.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    category: String,
}

impl TracingLogger {
    /// Returns the category this logger was created for.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }
}

impl Logger for TracingLogger {
    fn is_enabled(&self, level: LogLevel) -> bool {
        tracing::Level::from(level) <= LevelFilter::current()
    }

    fn log(&self, level: LogLevel, message: &str) {
        let category = self.category.as_str();
        match level {
            LogLevel::Trace => tracing::trace!(category, "{message}"),
            LogLevel::Debug => tracing::debug!(category, "{message}"),
            LogLevel::Info => tracing::info!(category, "{message}"),
            LogLevel::Warn => tracing::warn!(category, "{message}"),
            LogLevel::Error => tracing::error!(category, "{message}"),
        }
    }
}

/// Provides [`TracingLogger`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLoggerProvider;

impl LoggerProvider for TracingLoggerProvider {
    fn create(&self, category: &str) -> Arc<dyn Logger> {
        Arc::new(TracingLogger {
            category: category.to_string(),
        })
    }
}

/// Logs a lazily-built message if `level` is enabled.
pub(crate) fn log_with<F>(logger: &dyn Logger, level: LogLevel, message: F)
where
    F: FnOnce() -> String,
{
    if logger.is_enabled(level) {
        logger.log(level, &message());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn null_logger_is_disabled() {
        let logger = NullLoggerProvider.create("any");
        for level in [LogLevel::Trace, LogLevel::Error] {
            assert!(!logger.is_enabled(level));
        }
    }

    #[test]
    fn log_with_skips_disabled_levels() {
        let built = Cell::new(false);
        log_with(&NullLogger, LogLevel::Error, || {
            built.set(true);
            "never".to_string()
        });
        assert!(!built.get());
    }

    #[test]
    fn tracing_logger_keeps_category() {
        let provider = TracingLoggerProvider;
        let logger = provider.create("repokit::Repository<Customer>");
        logger.log(LogLevel::Debug, "smoke");
        let direct = TracingLogger {
            category: "x".into(),
        };
        assert_eq!(direct.category(), "x");
    }

    #[test]
    fn levels_are_ordered() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }
}
