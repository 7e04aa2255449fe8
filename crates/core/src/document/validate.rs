//! Scalar field validation for partial updates and inserts.
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("{0} is required")]
    Missing(String),
    #[error("{0} cannot be empty")]
    Empty(String),
    #[error("{field} must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
    #[error("no updatable fields supplied")]
    NothingToUpdate,
}

/// Accepted JSON shape for a plain (non-normalized) field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Number,
    Bool,
    /// Object or array passed through untouched.
    Structured,
}

impl FieldKind {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::Text => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Number => value.is_number(),
            FieldKind::Bool => value.is_boolean(),
            FieldKind::Structured => value.is_object() || value.is_array(),
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            FieldKind::Text => "a string",
            FieldKind::Integer => "an integer",
            FieldKind::Number => "a number",
            FieldKind::Bool => "a boolean",
            FieldKind::Structured => "an object or array",
        }
    }
}

pub fn as_object(body: &Value) -> Result<&Map<String, Value>, ValidationError> {
    body.as_object().ok_or(ValidationError::NotAnObject)
}

/// Copy the whitelisted fields present in `body` into a `$set` map.
///
/// `null` clears a field. Fields outside `allowed` are ignored.
pub fn pick_fields(
    body: &Map<String, Value>,
    allowed: &[(&str, FieldKind)],
) -> Result<Map<String, Value>, ValidationError> {
    let mut set = Map::new();
    for (field, kind) in allowed {
        match body.get(*field) {
            None => {}
            Some(Value::Null) => {
                set.insert((*field).to_string(), Value::Null);
            }
            Some(value) if kind.accepts(value) => {
                set.insert((*field).to_string(), value.clone());
            }
            Some(_) => {
                return Err(ValidationError::WrongType {
                    field: (*field).to_string(),
                    expected: kind.expected(),
                })
            }
        }
    }
    Ok(set)
}

/// Required non-blank string field, trimmed.
pub fn require_str(body: &Map<String, Value>, field: &str) -> Result<String, ValidationError> {
    match body.get(field) {
        None | Some(Value::Null) => Err(ValidationError::Missing(field.to_string())),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(ValidationError::Empty(field.to_string()))
        }
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(_) => Err(ValidationError::WrongType {
            field: field.to_string(),
            expected: "a string",
        }),
    }
}

/// Optional string field; blank strings count as absent.
pub fn optional_str(
    body: &Map<String, Value>,
    field: &str,
) -> Result<Option<String>, ValidationError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(ValidationError::WrongType {
            field: field.to_string(),
            expected: "a string",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn pick_fields_keeps_only_allowed() {
        let body = obj(json!({"name": "Іван", "birthYear": 1920, "premium": {"x": 1}}));
        let set = pick_fields(
            &body,
            &[("name", FieldKind::Text), ("birthYear", FieldKind::Integer)],
        )
        .unwrap();
        assert_eq!(Value::Object(set), json!({"name": "Іван", "birthYear": 1920}));
    }

    #[test]
    fn pick_fields_passes_null_through() {
        let body = obj(json!({"bio": null}));
        let set = pick_fields(&body, &[("bio", FieldKind::Text)]).unwrap();
        assert_eq!(set.get("bio"), Some(&Value::Null));
    }

    #[test]
    fn pick_fields_rejects_wrong_type() {
        let body = obj(json!({"birthYear": "1920"}));
        let err = pick_fields(&body, &[("birthYear", FieldKind::Integer)]).unwrap_err();
        assert_eq!(err.to_string(), "birthYear must be an integer");
    }

    #[test]
    fn require_str_trims_and_rejects_blank() {
        let body = obj(json!({"phone": " +380 ", "email": "  "}));
        assert_eq!(require_str(&body, "phone").unwrap(), "+380");
        assert_eq!(
            require_str(&body, "email").unwrap_err(),
            ValidationError::Empty("email".into())
        );
        assert_eq!(
            require_str(&body, "code").unwrap_err(),
            ValidationError::Missing("code".into())
        );
    }

    #[test]
    fn optional_str_treats_blank_as_absent() {
        let body = obj(json!({"churchName": " ", "price": 5}));
        assert_eq!(optional_str(&body, "churchName").unwrap(), None);
        assert!(optional_str(&body, "price").is_err());
    }
}
