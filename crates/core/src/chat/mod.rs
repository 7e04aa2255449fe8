//! Support chat messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::document::{Document, DocumentId};

/// Canned follow-up sent after a chat's first user message.
pub const AUTO_REPLY_TEXT: &str =
    "Дякуємо за звернення! Адміністратор відповість вам найближчим часом.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("sender must be \"user\" or \"admin\"")]
    InvalidSender,
    #[error("message needs text or an image")]
    Empty,
    #[error("{0} must be a string")]
    NotAString(&'static str),
    #[error("image is not valid base64")]
    InvalidImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Admin,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Sender> {
        match raw.trim() {
            "user" => Some(Sender::User),
            "admin" => Some(Sender::Admin),
            _ => None,
        }
    }
}

/// A validated message about to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub sender: Sender,
    pub text: String,
    /// Inline image, base64 or a `data:` URL, stored as submitted.
    pub image: Option<String>,
}

fn string_field(body: &Map<String, Value>, field: &'static str) -> Result<Option<String>, MessageError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(MessageError::NotAString(field)),
    }
}

/// Decode the payload of a base64 image, accepting a `data:<mime>;base64,` prefix.
fn decode_image(image: &str) -> Result<Vec<u8>, MessageError> {
    let payload = match image.split_once(";base64,") {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload,
        _ => image,
    };
    base64::decode(payload.trim()).map_err(|_| MessageError::InvalidImage)
}

impl MessageDraft {
    pub fn parse(body: &Map<String, Value>) -> Result<Self, MessageError> {
        let sender = string_field(body, "sender")?
            .as_deref()
            .and_then(Sender::parse)
            .ok_or(MessageError::InvalidSender)?;
        let text = string_field(body, "text")?.unwrap_or_default();
        let image = string_field(body, "image")?.filter(|s| !s.trim().is_empty());
        if let Some(image) = &image {
            decode_image(image)?;
        }
        if text.trim().is_empty() && image.is_none() {
            return Err(MessageError::Empty);
        }
        Ok(Self {
            sender,
            text,
            image,
        })
    }

    pub fn auto_reply(text: &str) -> Self {
        Self {
            sender: Sender::Admin,
            text: text.to_string(),
            image: None,
        }
    }

    pub fn into_content(self, chat_id: DocumentId, now: DateTime<Utc>) -> Map<String, Value> {
        let mut content = Map::new();
        content.insert("chatId".into(), json!(chat_id.to_string()));
        content.insert("sender".into(), json!(self.sender.as_str()));
        content.insert("text".into(), json!(self.text));
        if let Some(image) = self.image {
            content.insert("image".into(), json!(image));
        }
        content.insert("createdAt".into(), json!(now.to_rfc3339()));
        content
    }
}

/// Public representation of a stored message.
pub fn message_view(doc: &Document) -> Value {
    json!({
        "id": doc.id.to_string(),
        "chatId": doc.field_or_null("chatId"),
        "sender": doc.field_or_null("sender"),
        "text": doc.field_or_null("text"),
        "image": doc.field_or_null("image"),
        "createdAt": doc.field_or_null("createdAt"),
    })
}
