use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::DocumentId;

/// A schemaless document as held by the store.
/// Maps to a row of the `documents` PostgreSQL table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// Arbitrary document fields stored as JSONB.
    pub content: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(content: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::new(),
            content,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.content.get(field)
    }

    /// Value at a dotted path such as `premium.login`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.content.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// String field, `None` when absent or not a string.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.content.get(field).and_then(Value::as_str)
    }

    /// Field value or JSON `null`.
    pub fn field_or_null(&self, field: &str) -> Value {
        self.content.get(field).cloned().unwrap_or(Value::Null)
    }
}
