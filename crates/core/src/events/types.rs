use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events pushed to realtime subscribers after a successful write.
///
/// Serialized as `{"event": "newMessage", "data": {...}}`, the frame shape
/// WebSocket clients receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ChatEvent {
    NewMessage(MessageEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    /// Room identifier, the chat id.
    pub chat_id: String,
    /// The message as returned by the messages endpoint.
    pub message: Value,
}

impl ChatEvent {
    pub fn room(&self) -> &str {
        match self {
            ChatEvent::NewMessage(event) => &event.chat_id,
        }
    }
}
