//! Insert-only review queues for community submissions.
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::Utc;
use memoria_core::document::validate::ValidationError;
use memoria_core::document::Collection;
use serde_json::{json, Value};

use super::into_object;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/moderation/people", post(submit_person))
        .route("/api/moderation/locations", post(submit_location))
}

async fn submit(
    state: &AppState,
    collection: Collection,
    body: Value,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut content = into_object(body)?;
    content.remove("id");
    if content.is_empty() {
        return Err(ValidationError::NothingToUpdate.into());
    }
    let submitted_at = Utc::now().to_rfc3339();
    content.insert("submittedAt".into(), json!(submitted_at));

    let doc = state.store().insert(collection, content).await?;
    tracing::info!(submission = %doc.id, queue = collection.as_str(), "submission queued");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": doc.id.to_string(), "submittedAt": submitted_at })),
    ))
}

async fn submit_person(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    submit(&state, Collection::PeopleModeration, body).await
}

async fn submit_location(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    submit(&state, Collection::LocationModeration, body).await
}
