//! Fixtures for unit tests inside this crate.

use crate::interceptor::Auditable;
use crate::logging::{LogLevel, Logger, LoggerProvider};
use parking_lot::Mutex;
use repokit_context::{Entity, KeyValue};
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Widget {
    pub id: i64,
    pub label: String,
    pub created_at: Option<SystemTime>,
    pub modified_at: Option<SystemTime>,
}

impl Widget {
    pub fn new(id: i64, label: &str) -> Self {
        Self {
            id,
            label: label.to_string(),
            created_at: None,
            modified_at: None,
        }
    }
}

impl Entity for Widget {
    fn entity_name() -> &'static str {
        "Widget"
    }

    fn fields() -> &'static [&'static str] {
        &["id", "label", "created_at", "modified_at"]
    }

    fn key_value(&self, field: &str) -> Option<KeyValue> {
        match field {
            "id" => Some(KeyValue::Int(self.id)),
            "label" => Some(KeyValue::Text(self.label.clone())),
            _ => None,
        }
    }
}

impl Auditable for Widget {
    fn set_created_at(&mut self, at: SystemTime) {
        self.created_at = Some(at);
    }

    fn set_modified_at(&mut self, at: SystemTime) {
        self.modified_at = Some(at);
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Unkeyed {
    pub name: String,
}

impl Entity for Unkeyed {
    fn entity_name() -> &'static str {
        "Unkeyed"
    }

    fn fields() -> &'static [&'static str] {
        &["name"]
    }

    fn key_value(&self, field: &str) -> Option<KeyValue> {
        (field == "name").then(|| KeyValue::Text(self.name.clone()))
    }
}

/// Logger provider that keeps every enabled entry.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryLog {
    entries: Arc<Mutex<Vec<(LogLevel, String)>>>,
}

impl MemoryLog {
    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries.lock().clone()
    }

    pub fn at(&self, level: LogLevel) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|(entry_level, _)| *entry_level == level)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl Logger for MemoryLog {
    fn is_enabled(&self, _level: LogLevel) -> bool {
        true
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.entries.lock().push((level, message.to_string()));
    }
}

impl LoggerProvider for MemoryLog {
    fn create(&self, _category: &str) -> Arc<dyn Logger> {
        Arc::new(self.clone())
    }
}
