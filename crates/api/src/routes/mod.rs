pub mod cemeteries;
pub mod chats;
pub mod health;
pub mod liturgies;
pub mod locations;
pub mod moderation;
pub mod orders;
pub mod otp;
pub mod people;
pub mod premium;
pub mod proxies;
pub mod realtime;
pub mod ritual_services;
pub mod spaces;

use axum::Router;
use serde_json::{Map, Value};

use crate::error::ApiResult;
use crate::state::AppState;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(people::routes())
        .merge(premium::routes())
        .merge(locations::routes())
        .merge(cemeteries::routes())
        .merge(ritual_services::routes())
        .merge(otp::routes())
        .merge(orders::routes())
        .merge(chats::routes())
        .merge(realtime::routes())
        .merge(liturgies::routes())
        .merge(moderation::routes())
        .merge(spaces::routes())
        .merge(proxies::routes())
        .with_state(state)
}

/// Trimmed query parameter; blank counts as absent.
pub(crate) fn param(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Request body as a JSON object.
pub(crate) fn into_object(body: Value) -> ApiResult<Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(memoria_core::document::validate::ValidationError::NotAnObject.into()),
    }
}
