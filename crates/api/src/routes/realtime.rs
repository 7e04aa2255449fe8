//! `GET /ws`: clients join chat rooms and receive `newMessage` frames.
//!
//! Delivery is best-effort. Nothing is replayed on join and a client that
//! falls behind the broadcast buffer skips the events it missed.
use std::collections::HashSet;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use memoria_core::events::{ChatEvent, EventBus};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade))
}

/// Frames a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ClientFrame {
    JoinRoom {
        #[serde(rename = "chatId")]
        chat_id: String,
    },
    LeaveRoom {
        #[serde(rename = "chatId")]
        chat_id: String,
    },
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let events = state.event_bus().clone();
    ws.on_upgrade(move |socket| session(socket, events))
}

/// Apply a client frame to the joined rooms. Unknown frames are ignored.
fn apply_frame(rooms: &mut HashSet<String>, text: &str) {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::JoinRoom { chat_id }) => {
            tracing::debug!(chat = %chat_id, "joined room");
            rooms.insert(chat_id);
        }
        Ok(ClientFrame::LeaveRoom { chat_id }) => {
            rooms.remove(&chat_id);
        }
        Err(e) => tracing::debug!("ignoring client frame: {e}"),
    }
}

async fn session(mut socket: WebSocket, events: EventBus) {
    let mut rooms = HashSet::new();
    let mut receiver = events.subscribe();

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => apply_frame(&mut rooms, text.as_str()),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!("websocket receive failed: {e}");
                    break;
                }
            },
            event = receiver.recv() => match event {
                Ok(event) if rooms.contains(event.room()) => {
                    if let Err(e) = forward(&mut socket, &event).await {
                        tracing::debug!("websocket send failed: {e}");
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "websocket subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}

async fn forward(socket: &mut WebSocket, event: &ChatEvent) -> Result<(), axum::Error> {
    let frame = match serde_json::to_string(event) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!("unserializable chat event: {e}");
            return Ok(());
        }
    };
    socket.send(Message::Text(frame.into())).await
}
