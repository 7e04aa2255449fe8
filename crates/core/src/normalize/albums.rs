use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{description_of, non_blank, NormalizeError, VideoRef};

/// One album inside a ritual-service gallery section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Album {
    Video {
        video: VideoRef,
        #[serde(default)]
        description: String,
    },
    Photos {
        photos: Vec<String>,
        #[serde(default)]
        description: String,
    },
}

impl Album {
    pub fn to_value(&self) -> Value {
        match self {
            Album::Video { video, description } => {
                json!({ "video": video.to_value(), "description": description })
            }
            Album::Photos {
                photos,
                description,
            } => json!({ "photos": photos, "description": description }),
        }
    }
}

/// A titled gallery section, stored as a `[title, albums]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemGroup(pub String, pub Vec<Album>);

impl ItemGroup {
    pub fn title(&self) -> &str {
        &self.0
    }

    pub fn albums(&self) -> &[Album] {
        &self.1
    }

    pub fn to_value(&self) -> Value {
        json!([self.0, self.1.iter().map(Album::to_value).collect::<Vec<_>>()])
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Strict,
    Lenient,
}

/// Collect photo URLs from an array. Blank strings are skipped in both modes;
/// other non-string entries are an error only in strict mode.
fn photo_urls(values: &[Value], path: &str, mode: Mode) -> Result<Vec<String>, NormalizeError> {
    let mut urls = Vec::with_capacity(values.len());
    for (i, value) in values.iter().enumerate() {
        match value {
            Value::String(url) if url.trim().is_empty() => {}
            Value::String(url) => urls.push(url.trim().to_string()),
            _ if mode == Mode::Lenient => {}
            _ => return Err(NormalizeError::NotAString(format!("{path}[{i}]"))),
        }
    }
    Ok(urls)
}

fn photo_album(photos: Vec<String>, description: String, path: &str) -> Result<Album, NormalizeError> {
    if photos.is_empty() {
        return Err(NormalizeError::EmptyAlbum(path.to_string()));
    }
    Ok(Album::Photos {
        photos,
        description,
    })
}

fn album_from_object(map: &Map<String, Value>, path: &str, mode: Mode) -> Result<Album, NormalizeError> {
    let description = description_of(map, path)?;
    if let Some(Value::Object(video)) = map.get("video") {
        if !video.is_empty() {
            let video = VideoRef::parse(video, &format!("{path}.video"))?;
            return Ok(Album::Video { video, description });
        }
    }
    let photos = match map.get("photos") {
        Some(Value::Array(values)) => photo_urls(values, &format!("{path}.photos"), mode)?,
        Some(single @ Value::String(_)) => non_blank(Some(single)).into_iter().collect(),
        None | Some(Value::Null) => non_blank(map.get("url")).into_iter().collect(),
        Some(_) => {
            return Err(NormalizeError::InvalidShape {
                path: format!("{path}.photos"),
                expected: "an array of URLs",
            })
        }
    };
    photo_album(photos, description, path)
}

fn coerce_album(value: &Value, path: &str, mode: Mode) -> Result<Album, NormalizeError> {
    match value {
        Value::String(_) => {
            photo_album(non_blank(Some(value)).into_iter().collect(), String::new(), path)
        }
        Value::Array(values) => photo_album(photo_urls(values, path, mode)?, String::new(), path),
        Value::Object(map) => album_from_object(map, path, mode),
        _ => Err(NormalizeError::InvalidShape {
            path: path.to_string(),
            expected: "a URL, a list of URLs or an album object",
        }),
    }
}

/// Write path for `ritual_services.items`: a list of `[title, albums]` pairs.
///
/// An album that resolves to neither a photo URL nor a video player is
/// rejected, naming its position, e.g. `items[0][1][2]`.
pub fn validate_items(value: &Value) -> Result<Vec<ItemGroup>, NormalizeError> {
    let groups = value
        .as_array()
        .ok_or_else(|| NormalizeError::NotAnArray("items".to_string()))?;
    groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let path = format!("items[{i}]");
            let (title, albums) = match group.as_array().map(Vec::as_slice) {
                Some([Value::String(title), Value::Array(albums)]) => (title, albums),
                Some([Value::String(_), _]) => {
                    return Err(NormalizeError::NotAnArray(format!("{path}[1]")))
                }
                _ => {
                    return Err(NormalizeError::InvalidShape {
                        path,
                        expected: "a [title, albums] pair",
                    })
                }
            };
            let albums = albums
                .iter()
                .enumerate()
                .map(|(j, album)| coerce_album(album, &format!("{path}[1][{j}]"), Mode::Strict))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ItemGroup(title.trim().to_string(), albums))
        })
        .collect()
}

/// Read path: tolerates `{title, albums}` objects and a lone album in place of
/// a list, and silently drops albums that cannot be resolved.
pub fn expand_items(value: Option<&Value>) -> Vec<ItemGroup> {
    let Some(Value::Array(groups)) = value else {
        return Vec::new();
    };
    groups
        .iter()
        .filter_map(|group| {
            let (title, albums) = match group {
                Value::Array(pair) => match pair.as_slice() {
                    [Value::String(title), albums] => (title, albums),
                    _ => return None,
                },
                Value::Object(map) => match (map.get("title"), map.get("albums")) {
                    (Some(Value::String(title)), Some(albums)) => (title, albums),
                    _ => return None,
                },
                _ => return None,
            };
            let candidates = match albums {
                Value::Array(list) => list.iter().collect::<Vec<_>>(),
                single => vec![single],
            };
            let albums = candidates
                .into_iter()
                .filter_map(|album| coerce_album(album, "", Mode::Lenient).ok())
                .collect();
            Some(ItemGroup(title.trim().to_string(), albums))
        })
        .collect()
}

pub fn to_values(groups: &[ItemGroup]) -> Value {
    Value::Array(groups.iter().map(ItemGroup::to_value).collect())
}
