//! Coercion of polymorphic embedded fields into their canonical shapes.
//!
//! Every field has two entry points: `validate_*` for the write path, which
//! rejects the first malformed entry, and `expand_*` for the read path, which
//! drops malformed entries so that legacy documents already in the store
//! still render.

pub mod albums;
pub mod media;
pub mod relatives;

use serde_json::{Map, Value};
use thiserror::Error;

pub use albums::{expand_items, validate_items, Album, ItemGroup};
pub use media::{expand_photos, validate_photos, MediaItem, VideoRef};
pub use relatives::{expand_relatives, validate_relatives, Relative, Role};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("{0} must be an array")]
    NotAnArray(String),
    #[error("{path} must be {expected}")]
    InvalidShape { path: String, expected: &'static str },
    #[error("{0} must be a non-empty string")]
    Blank(String),
    #[error("{0} must be a string")]
    NotAString(String),
    #[error("{path} is not a valid person id: {value:?}")]
    InvalidId { path: String, value: String },
    #[error("{path} has unknown role {role:?}")]
    UnknownRole { path: String, role: String },
    #[error("{0} must contain at least one photo URL or a video player")]
    EmptyAlbum(String),
}

/// `description` defaults to an empty string and must be a string if present.
pub(crate) fn description_of(
    map: &Map<String, Value>,
    path: &str,
) -> Result<String, NormalizeError> {
    match map.get("description") {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(NormalizeError::NotAString(format!("{path}.description"))),
    }
}

/// Trimmed non-blank string, or `None`.
pub(crate) fn non_blank(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}
