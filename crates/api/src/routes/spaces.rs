use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use memoria_core::document::validate::require_str;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{into_object, param};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::gateways::PresignedUpload;
use crate::state::AppState;

const VIDEO_PREFIX: &str = "videos/";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/spaces/video-upload-url", get(video_upload_url))
        .route("/api/spaces/make-public", post(make_public))
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
}

/// Keep only characters that are safe in an object key.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "video.mp4".to_string()
    } else {
        cleaned.to_string()
    }
}

fn upload_key(filename: Option<&str>) -> String {
    format!(
        "{VIDEO_PREFIX}{}-{}",
        Uuid::new_v4(),
        sanitize_filename(filename.unwrap_or_default())
    )
}

/// Presigned PUT URL for a new video. The key is server generated.
async fn video_upload_url(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
) -> ApiResult<Json<PresignedUpload>> {
    let key = upload_key(param(&query.filename));
    let upload = state.gateways().storage.presign_upload(&key, Utc::now())?;
    tracing::info!(%key, "video upload presigned");
    Ok(Json(upload))
}

async fn make_public(State(state): State<AppState>, ApiJson(body): ApiJson<Value>) -> ApiResult<Json<Value>> {
    let body = into_object(body)?;
    let key = require_str(&body, "key")?;
    if !key.starts_with(VIDEO_PREFIX) || key.contains("..") {
        return Err(ApiError::BadRequest(format!("key must live under {VIDEO_PREFIX}")));
    }
    let url = state.gateways().storage.make_public(&key).await?;
    Ok(Json(json!({ "key": key, "url": url })))
}
