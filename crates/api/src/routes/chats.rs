//! Support chats. Every stored message is fanned out to WebSocket rooms.
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use memoria_core::chat::{message_view, MessageDraft, Sender};
use memoria_core::document::{Collection, Document, DocumentId};
use memoria_core::events::{types::MessageEvent, ChatEvent, EventBus};
use memoria_core::query::{Filter, FindOptions};
use memoria_core::store::{DocumentStore, StoreError};
use serde_json::{json, Map, Value};

use super::into_object;
use crate::error::{parse_id, ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/chats", post(create_chat).get(list_chats))
        .route(
            "/api/chats/{id}/messages",
            get(list_messages).post(post_message),
        )
}

fn chat_view(doc: &Document) -> Value {
    json!({
        "id": doc.id.to_string(),
        "createdAt": doc.field_or_null("createdAt"),
    })
}

async fn load_chat(state: &AppState, raw_id: &str) -> ApiResult<Document> {
    let id = parse_id(raw_id, "chat")?;
    state
        .store()
        .get(Collection::Chats, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chat not found".into()))
}

/// Store a message and push it to the chat's room.
async fn deliver(
    store: &dyn DocumentStore,
    events: &EventBus,
    chat_id: DocumentId,
    draft: MessageDraft,
) -> Result<Value, StoreError> {
    let doc = store
        .insert(Collection::Messages, draft.into_content(chat_id, Utc::now()))
        .await?;
    let message = message_view(&doc);
    let reached = events.publish(ChatEvent::NewMessage(MessageEvent {
        chat_id: chat_id.to_string(),
        message: message.clone(),
    }));
    tracing::debug!(chat = %chat_id, reached, "message published");
    Ok(message)
}

fn schedule_auto_reply(state: &AppState, chat_id: DocumentId) {
    let store: Arc<dyn DocumentStore> = state.store_handle();
    let events = state.event_bus().clone();
    let delay = Duration::from_secs(state.config().chat_auto_reply_delay_secs);
    let draft = MessageDraft::auto_reply(&state.config().chat_auto_reply_text);

    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = deliver(store.as_ref(), &events, chat_id, draft).await {
            tracing::error!(chat = %chat_id, "auto reply failed: {e}");
        }
    });
}

async fn create_chat(State(state): State<AppState>) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut content = Map::new();
    content.insert("createdAt".into(), json!(Utc::now().to_rfc3339()));
    let chat = state.store().insert(Collection::Chats, content).await?;
    tracing::info!(chat = %chat.id, "chat opened");
    Ok((StatusCode::CREATED, Json(chat_view(&chat))))
}

async fn list_chats(State(state): State<AppState>) -> ApiResult<Json<Vec<Value>>> {
    let chats = state
        .store()
        .find(Collection::Chats, &Filter::All, FindOptions::newest_first())
        .await?;
    Ok(Json(chats.iter().map(chat_view).collect()))
}

async fn list_messages(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Vec<Value>>> {
    let chat = load_chat(&state, &id).await?;
    let messages = state
        .store()
        .find(
            Collection::Messages,
            &Filter::eq("chatId", chat.id.to_string()),
            FindOptions::default(),
        )
        .await?;
    Ok(Json(messages.iter().map(message_view).collect()))
}

async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let chat = load_chat(&state, &id).await?;
    let draft = MessageDraft::parse(&into_object(body)?)?;

    let first_from_user = draft.sender == Sender::User
        && state
            .store()
            .find_one(
                Collection::Messages,
                &Filter::all_of(vec![
                    Filter::eq("chatId", chat.id.to_string()),
                    Filter::eq("sender", Sender::User.as_str()),
                ]),
            )
            .await?
            .is_none();

    let message = deliver(state.store(), state.event_bus(), chat.id, draft).await?;
    if first_from_user {
        schedule_auto_reply(&state, chat.id);
    }
    Ok((StatusCode::CREATED, Json(message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_support::TestApp;

    async fn open_chat(app: &TestApp) -> String {
        let (status, body) = app.post("/api/chats", json!({})).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    async fn wait_for_messages(app: &TestApp, chat: &str, count: usize) -> Value {
        for _ in 0..50 {
            let (_, body) = app.get(&format!("/api/chats/{chat}/messages")).await;
            if body.as_array().map_or(0, Vec::len) >= count {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("chat {chat} never reached {count} messages");
    }

    #[tokio::test]
    async fn first_user_message_gets_one_auto_reply() {
        let app = TestApp::new();
        let chat = open_chat(&app).await;
        let uri = format!("/api/chats/{chat}/messages");

        let (status, message) = app.post(&uri, json!({"sender": "user", "text": "Добрий день"})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(message["chatId"], chat.as_str());

        let messages = wait_for_messages(&app, &chat, 2).await;
        assert_eq!(messages[1]["sender"], "admin");
        assert_eq!(messages[1]["text"], memoria_core::chat::AUTO_REPLY_TEXT);

        app.post(&uri, json!({"sender": "user", "text": "Ще питання"})).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let (_, messages) = app.get(&uri).await;
        assert_eq!(messages.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn posted_message_reaches_subscribers() {
        let app = TestApp::new();
        let chat = open_chat(&app).await;
        let mut events = app.state.event_bus().subscribe();

        app.post(
            &format!("/api/chats/{chat}/messages"),
            json!({"sender": "admin", "text": "Вітаємо"}),
        )
        .await;

        let event = events.recv().await.unwrap();
        assert_eq!(event.room(), chat);
        let ChatEvent::NewMessage(event) = event;
        assert_eq!(event.message["text"], "Вітаємо");
    }

    #[tokio::test]
    async fn invalid_messages_are_rejected() {
        let app = TestApp::new();
        let chat = open_chat(&app).await;
        let uri = format!("/api/chats/{chat}/messages");

        let (status, _) = app.post(&uri, json!({"sender": "bot", "text": "x"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = app.post(&uri, json!({"sender": "user", "text": " "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = app
            .post(&uri, json!({"sender": "user", "image": "data:image/png;base64,@@@"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .post("/api/chats/0190a5b0-0000-7000-8000-000000000000/messages", json!({"sender": "user", "text": "x"}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn chats_list_newest_first() {
        let app = TestApp::new();
        let first = open_chat(&app).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = open_chat(&app).await;
        let (_, chats) = app.get("/api/chats").await;
        assert_eq!(chats[0]["id"], second.as_str());
        assert_eq!(chats[1]["id"], first.as_str());
    }
}
