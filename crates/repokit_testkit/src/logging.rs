//! Log capture.

use parking_lot::Mutex;
use repokit_core::{LogLevel, Logger, LoggerProvider};
use std::sync::Arc;

/// One captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Logger category.
    pub category: String,
    /// Severity.
    pub level: LogLevel,
    /// Rendered message.
    pub message: String,
}

/// A logger provider that keeps every entry at or above a minimum level.
///
/// Clones share the captured entries.
#[derive(Debug, Clone)]
pub struct CapturingLoggerProvider {
    records: Arc<Mutex<Vec<LogRecord>>>,
    min_level: LogLevel,
}

impl CapturingLoggerProvider {
    /// Captures every level.
    pub fn new() -> Self {
        Self::with_min_level(LogLevel::Trace)
    }

    /// Captures `min_level` and above.
    pub fn with_min_level(min_level: LogLevel) -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            min_level,
        }
    }

    /// Returns a copy of every captured entry.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Messages captured at exactly `level`.
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|record| record.level == level)
            .map(|record| record.message.clone())
            .collect()
    }

    /// Messages captured at error level.
    pub fn errors(&self) -> Vec<String> {
        self.messages_at(LogLevel::Error)
    }

    /// Drops every captured entry.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Default for CapturingLoggerProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerProvider for CapturingLoggerProvider {
    fn create(&self, category: &str) -> Arc<dyn Logger> {
        Arc::new(CapturingLogger {
            category: category.to_string(),
            records: Arc::clone(&self.records),
            min_level: self.min_level,
        })
    }
}

struct CapturingLogger {
    category: String,
    records: Arc<Mutex<Vec<LogRecord>>>,
    min_level: LogLevel,
}

impl Logger for CapturingLogger {
    fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    fn log(&self, level: LogLevel, message: &str) {
        if !self.is_enabled(level) {
            return;
        }
        self.records.lock().push(LogRecord {
            category: self.category.clone(),
            level,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_levels_are_dropped() {
        let provider = CapturingLoggerProvider::with_min_level(LogLevel::Warn);
        let logger = provider.create("tests");
        assert!(!logger.is_enabled(LogLevel::Debug));

        logger.log(LogLevel::Debug, "quiet");
        logger.log(LogLevel::Error, "loud");
        assert_eq!(provider.errors(), vec!["loud"]);
        assert_eq!(provider.records()[0].category, "tests");
    }
}
