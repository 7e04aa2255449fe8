use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{description_of, non_blank, NormalizeError};

/// Embeddable video reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    pub player: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
}

impl VideoRef {
    /// Parse a `video` sub-object. `path` points at the object itself.
    pub(crate) fn parse(map: &Map<String, Value>, path: &str) -> Result<Self, NormalizeError> {
        let player =
            non_blank(map.get("player")).ok_or_else(|| NormalizeError::Blank(format!("{path}.player")))?;
        let poster = match map.get("poster") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(_) => return Err(NormalizeError::NotAString(format!("{path}.poster"))),
        };
        Ok(Self { player, poster })
    }

    pub fn to_value(&self) -> Value {
        match &self.poster {
            Some(poster) => json!({ "player": self.player, "poster": poster }),
            None => json!({ "player": self.player }),
        }
    }
}

/// One entry of a person's gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaItem {
    Video {
        video: VideoRef,
        #[serde(default)]
        description: String,
    },
    Photo {
        url: String,
        #[serde(default)]
        description: String,
    },
}

impl MediaItem {
    pub fn photo(url: impl Into<String>, description: impl Into<String>) -> Self {
        MediaItem::Photo {
            url: url.into(),
            description: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            MediaItem::Video { description, .. } | MediaItem::Photo { description, .. } => {
                description
            }
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            MediaItem::Video { video, description } => {
                json!({ "video": video.to_value(), "description": description })
            }
            MediaItem::Photo { url, description } => {
                json!({ "url": url, "description": description })
            }
        }
    }

    /// Coerce one submitted entry. `path` is used in error messages.
    fn coerce(value: &Value, path: &str) -> Result<Self, NormalizeError> {
        match value {
            Value::String(url) if url.trim().is_empty() => Err(NormalizeError::Blank(path.to_string())),
            Value::String(url) => Ok(MediaItem::photo(url.trim(), "")),
            Value::Object(map) => {
                let description = description_of(map, path)?;
                if let Some(Value::Object(video)) = map.get("video") {
                    if !video.is_empty() {
                        let video = VideoRef::parse(video, &format!("{path}.video"))?;
                        return Ok(MediaItem::Video { video, description });
                    }
                }
                let url = non_blank(map.get("url"))
                    .ok_or_else(|| NormalizeError::Blank(format!("{path}.url")))?;
                Ok(MediaItem::Photo { url, description })
            }
            _ => Err(NormalizeError::InvalidShape {
                path: path.to_string(),
                expected: "a URL string or a photo/video object",
            }),
        }
    }
}

/// Write path: every entry must coerce, otherwise the whole field is rejected.
pub fn validate_photos(field: &str, value: &Value) -> Result<Vec<MediaItem>, NormalizeError> {
    let items = value
        .as_array()
        .ok_or_else(|| NormalizeError::NotAnArray(field.to_string()))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| MediaItem::coerce(item, &format!("{field}[{i}]")))
        .collect()
}

/// Read path: malformed entries are skipped. A bare string is a one-photo gallery.
pub fn expand_photos(value: Option<&Value>) -> Vec<MediaItem> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| MediaItem::coerce(item, "").ok())
            .collect(),
        Some(single @ Value::String(_)) => MediaItem::coerce(single, "").into_iter().collect(),
        _ => Vec::new(),
    }
}

pub fn to_values(items: &[MediaItem]) -> Value {
    Value::Array(items.iter().map(MediaItem::to_value).collect())
}
