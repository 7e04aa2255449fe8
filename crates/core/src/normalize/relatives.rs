use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::NormalizeError;
use crate::document::DocumentId;

/// Kinship roles a relative link may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Батько")]
    Father,
    #[serde(rename = "Мати")]
    Mother,
    #[serde(rename = "Брат")]
    Brother,
    #[serde(rename = "Сестра")]
    Sister,
    #[serde(rename = "Син")]
    Son,
    #[serde(rename = "Донька")]
    Daughter,
    #[serde(rename = "Чоловік")]
    Husband,
    #[serde(rename = "Дружина")]
    Wife,
    #[serde(rename = "Дідусь")]
    Grandfather,
    #[serde(rename = "Бабуся")]
    Grandmother,
    #[serde(rename = "Онук")]
    Grandson,
    #[serde(rename = "Онука")]
    Granddaughter,
}

impl Role {
    pub const ALL: [Role; 12] = [
        Role::Father,
        Role::Mother,
        Role::Brother,
        Role::Sister,
        Role::Son,
        Role::Daughter,
        Role::Husband,
        Role::Wife,
        Role::Grandfather,
        Role::Grandmother,
        Role::Grandson,
        Role::Granddaughter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Father => "Батько",
            Role::Mother => "Мати",
            Role::Brother => "Брат",
            Role::Sister => "Сестра",
            Role::Son => "Син",
            Role::Daughter => "Донька",
            Role::Husband => "Чоловік",
            Role::Wife => "Дружина",
            Role::Grandfather => "Дідусь",
            Role::Grandmother => "Бабуся",
            Role::Grandson => "Онук",
            Role::Granddaughter => "Онука",
        }
    }

    /// Case-insensitive lookup by display name.
    pub fn parse(raw: &str) -> Option<Role> {
        let wanted = raw.trim().to_lowercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().to_lowercase() == wanted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relative {
    pub person_id: DocumentId,
    pub role: Role,
}

impl Relative {
    pub fn to_value(&self) -> Value {
        json!({ "personId": self.person_id.to_string(), "role": self.role.as_str() })
    }

    fn coerce(value: &Value, path: &str) -> Result<Self, NormalizeError> {
        let map = value.as_object().ok_or(NormalizeError::InvalidShape {
            path: path.to_string(),
            expected: "an object with personId and role",
        })?;
        let raw_id = match map.get("personId").or_else(|| map.get("id")) {
            Some(Value::String(s)) => s.as_str(),
            None | Some(Value::Null) => {
                return Err(NormalizeError::Blank(format!("{path}.personId")))
            }
            Some(other) => {
                return Err(NormalizeError::InvalidId {
                    path: format!("{path}.personId"),
                    value: other.to_string(),
                })
            }
        };
        let person_id = DocumentId::parse(raw_id).map_err(|_| NormalizeError::InvalidId {
            path: format!("{path}.personId"),
            value: raw_id.to_string(),
        })?;
        let raw_role = map
            .get("role")
            .and_then(Value::as_str)
            .ok_or_else(|| NormalizeError::NotAString(format!("{path}.role")))?;
        let role = Role::parse(raw_role).ok_or_else(|| NormalizeError::UnknownRole {
            path: format!("{path}.role"),
            role: raw_role.to_string(),
        })?;
        Ok(Relative { person_id, role })
    }
}

/// A later entry for the same person replaces the earlier one and takes its
/// own position in the list.
fn dedupe_last_wins(relatives: Vec<Relative>) -> Vec<Relative> {
    let mut out: Vec<Relative> = Vec::with_capacity(relatives.len());
    for relative in relatives {
        out.retain(|kept| kept.person_id != relative.person_id);
        out.push(relative);
    }
    out
}

/// Write path. Any malformed entry aborts the whole update.
pub fn validate_relatives(value: &Value) -> Result<Vec<Relative>, NormalizeError> {
    let entries = value
        .as_array()
        .ok_or_else(|| NormalizeError::NotAnArray("relatives".to_string()))?;
    let relatives = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| Relative::coerce(entry, &format!("relatives[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(dedupe_last_wins(relatives))
}

/// Read path. Malformed entries are dropped.
pub fn expand_relatives(value: Option<&Value>) -> Vec<Relative> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };
    dedupe_last_wins(
        entries
            .iter()
            .filter_map(|entry| Relative::coerce(entry, "").ok())
            .collect(),
    )
}

pub fn to_values(relatives: &[Relative]) -> Value {
    Value::Array(relatives.iter().map(Relative::to_value).collect())
}
