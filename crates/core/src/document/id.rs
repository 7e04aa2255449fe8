//! Document identifiers and the collections they live in.
//!
//! Every document is keyed by a UUID generated at insert time (v7, so ids
//! carry their creation millisecond).
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid document id: {0:?}")]
pub struct InvalidId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parse a client-supplied id. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, InvalidId> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| InvalidId(raw.to_string()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for DocumentId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for DocumentId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Named groups of documents in the shared store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    People,
    Areas,
    Cemeteries,
    RitualServices,
    Orders,
    Chats,
    Messages,
    Liturgies,
    PeopleModeration,
    LocationModeration,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::People => "people",
            Collection::Areas => "areas",
            Collection::Cemeteries => "cemeteries",
            Collection::RitualServices => "ritual_services",
            Collection::Orders => "orders",
            Collection::Chats => "chats",
            Collection::Messages => "messages",
            Collection::Liturgies => "liturgies",
            Collection::PeopleModeration => "moderation_people",
            Collection::LocationModeration => "moderation_locations",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_display() {
        let id = DocumentId::new();
        let parsed = DocumentId::parse(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_trims_whitespace() {
        let id = DocumentId::new();
        assert_eq!(DocumentId::parse(&format!("  {id} ")).unwrap(), id);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = DocumentId::parse("not-an-id").unwrap_err();
        assert_eq!(err, InvalidId("not-an-id".to_string()));
        assert!(DocumentId::parse("").is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = DocumentId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }
}
