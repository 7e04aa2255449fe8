use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use memoria_core::auth::{PasswordError, ResetError, TokenError};
use memoria_core::chat::MessageError;
use memoria_core::document::validate::ValidationError;
use memoria_core::document::InvalidId;
use memoria_core::normalize::NormalizeError;
use memoria_core::store::StoreError;
use serde_json::json;

use crate::gateways::GatewayError;

/// API error type mapped to JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("upstream error: {0}")]
    Upstream(#[from] GatewayError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<NormalizeError> for ApiError {
    fn from(err: NormalizeError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<MessageError> for ApiError {
    fn from(err: MessageError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<ResetError> for ApiError {
    fn from(err: ResetError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => ApiError::Unauthorized(err.to_string()),
            TokenError::Sign(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// Parse a path or body id, reporting which entity it was meant to name.
pub fn parse_id(raw: &str, what: &str) -> Result<memoria_core::document::DocumentId, ApiError> {
    memoria_core::document::DocumentId::parse(raw)
        .map_err(|InvalidId(_)| ApiError::BadRequest(format!("Invalid {what} id")))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut details = None;
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "notFound", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "badRequest", msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payloadTooLarge", msg.clone())
            }
            ApiError::Upstream(err) => {
                tracing::warn!(provider = err.provider, status = ?err.status, "upstream failure: {}", err.details);
                details = Some(json!({
                    "provider": err.provider,
                    "status": err.status,
                    "body": err.details,
                }));
                (
                    StatusCode::BAD_GATEWAY,
                    "upstreamError",
                    format!("{} request failed", err.provider),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Store(err) => {
                tracing::error!("Store error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "type": error_type,
            "message": message,
            "statusCode": status.as_u16(),
        });
        if let Some(details) = details {
            error["details"] = details;
        }
        let body = json!({ "error": error, "description": message });

        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;
