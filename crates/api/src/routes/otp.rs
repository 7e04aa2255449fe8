use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use memoria_core::document::validate::require_str;
use serde_json::{json, Value};

use super::into_object;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::gateways::OtpCheck;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/send-code", post(send_code))
        .route("/api/verify-code", post(verify_code))
}

/// Start an SMS verification; replies with the provider status, e.g. `pending`.
async fn send_code(State(state): State<AppState>, ApiJson(body): ApiJson<Value>) -> ApiResult<Json<Value>> {
    let body = into_object(body)?;
    let phone = require_str(&body, "phone")?;
    let status = state.gateways().otp.send_code(&phone).await?;
    Ok(Json(json!({ "status": status })))
}

/// A wrong or expired code is a 401 with `success: false`; a provider outage
/// surfaces as 502 through the error type instead.
async fn verify_code(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = into_object(body)?;
    let phone = require_str(&body, "phone")?;
    let code = require_str(&body, "code")?;
    match state.gateways().otp.check_code(&phone, &code).await? {
        OtpCheck::Approved => Ok((StatusCode::OK, Json(json!({ "success": true })))),
        OtpCheck::Rejected => Ok((StatusCode::UNAUTHORIZED, Json(json!({ "success": false })))),
    }
}
