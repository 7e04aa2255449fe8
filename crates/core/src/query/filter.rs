//! Document filters shared by every store backend.
//!
//! The in-memory store evaluates a `Filter` directly against document JSON;
//! the PostgreSQL store renders the same tree to SQL over the JSONB column.

use serde_json::Value;

use crate::document::{Document, DocumentId};

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    /// Field equals the value exactly.
    Eq(String, Value),
    /// Case-insensitive substring match. On an array field, any string
    /// element may match.
    Contains(String, String),
    /// Document id is one of the listed ids.
    IdIn(Vec<DocumentId>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn contains(field: &str, needle: &str) -> Self {
        Filter::Contains(field.to_string(), needle.to_string())
    }

    /// Conjunction that collapses trivial cases so backends see small trees.
    pub fn all_of(mut filters: Vec<Filter>) -> Self {
        filters.retain(|f| *f != Filter::All);
        match filters.len() {
            0 => Filter::All,
            1 => filters.remove(0),
            _ => Filter::And(filters),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, expected) => doc.lookup(field) == Some(expected),
            Filter::Contains(field, needle) => {
                let needle = needle.to_lowercase();
                match doc.lookup(field) {
                    Some(Value::String(s)) => s.to_lowercase().contains(&needle),
                    Some(Value::Array(items)) => items.iter().any(|item| {
                        item.as_str()
                            .is_some_and(|s| s.to_lowercase().contains(&needle))
                    }),
                    _ => false,
                }
            }
            Filter::IdIn(ids) => ids.contains(&doc.id),
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }

    /// Field/value pairs that every matching document must carry. Used to
    /// seed the document created by an upsert.
    pub fn equalities(&self) -> Vec<(&str, &Value)> {
        match self {
            Filter::Eq(field, value) => vec![(field.as_str(), value)],
            Filter::And(filters) => filters.iter().flat_map(Filter::equalities).collect(),
            _ => Vec::new(),
        }
    }
}

/// Ordering and paging for `find`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub newest_first: bool,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn newest_first() -> Self {
        Self {
            newest_first: true,
            limit: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
