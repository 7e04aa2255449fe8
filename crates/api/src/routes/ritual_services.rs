use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::Utc;
use memoria_core::auth::verify_password;
use memoria_core::document::validate::{pick_fields, require_str, FieldKind, ValidationError};
use memoria_core::document::{Collection, Document};
use memoria_core::mutation::Patch;
use memoria_core::normalize::{self, expand_items, validate_items};
use memoria_core::query::Filter;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{into_object, param};
use crate::error::{parse_id, ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

const EDITABLE_FIELDS: &[(&str, FieldKind)] = &[
    ("name", FieldKind::Text),
    ("address", FieldKind::Text),
    ("category", FieldKind::Text),
    ("logo", FieldKind::Text),
    ("latitude", FieldKind::Number),
    ("longitude", FieldKind::Number),
    ("banner", FieldKind::Text),
    ("description", FieldKind::Text),
    ("link", FieldKind::Text),
    ("phone", FieldKind::Text),
];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/ritual_services", get(list_services))
        .route("/api/ritual_services/login", post(login))
        .route("/api/ritual_services/verify_token", post(verify_token))
        .route(
            "/api/ritual_services/{id}",
            get(get_service).put(update_service),
        )
}

#[derive(Debug, Deserialize)]
pub struct ServiceQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub address: Option<String>,
}

/// Vendor as shown to clients. Gallery items are re-expanded so albums that
/// no longer resolve to any media are left out; login data is never shown.
fn service_view(doc: &Document) -> Value {
    json!({
        "id": doc.id.to_string(),
        "name": doc.field_or_null("name"),
        "address": doc.field_or_null("address"),
        "category": doc.field_or_null("category"),
        "logo": doc.field_or_null("logo"),
        "latitude": doc.field_or_null("latitude"),
        "longitude": doc.field_or_null("longitude"),
        "banner": doc.field_or_null("banner"),
        "description": doc.field_or_null("description"),
        "link": doc.field_or_null("link"),
        "phone": doc.field_or_null("phone"),
        "items": normalize::albums::to_values(&expand_items(doc.get("items"))),
    })
}

async fn list_services(
    State(state): State<AppState>,
    Query(query): Query<ServiceQuery>,
) -> ApiResult<Json<Vec<Value>>> {
    let mut filters = Vec::new();
    if let Some(name) = param(&query.search) {
        filters.push(Filter::contains("name", name));
    }
    if let Some(category) = param(&query.category) {
        filters.push(Filter::contains("category", category));
    }
    if let Some(address) = param(&query.address) {
        filters.push(Filter::contains("address", address));
    }
    let docs = state
        .store()
        .find(Collection::RitualServices, &Filter::all_of(filters), Default::default())
        .await?;
    Ok(Json(docs.iter().map(service_view).collect()))
}

async fn get_service(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "ritual service")?;
    let doc = state
        .store()
        .get(Collection::RitualServices, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ritual service not found".into()))?;
    Ok(Json(service_view(&doc)))
}

async fn update_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "ritual service")?;
    let Some(TypedHeader(auth)) = bearer else {
        return Err(ApiError::Unauthorized("Bearer token required".into()));
    };
    if state.jwt().verify(auth.token())? != id {
        return Err(ApiError::Unauthorized(
            "Token does not grant access to this ritual service".into(),
        ));
    }

    let body = into_object(body)?;
    let mut set = pick_fields(&body, EDITABLE_FIELDS)?;
    match body.get("items") {
        None => {}
        Some(Value::Null) => {
            set.insert("items".into(), json!([]));
        }
        Some(items) => {
            let groups = validate_items(items)?;
            set.insert("items".into(), normalize::albums::to_values(&groups));
        }
    }
    if set.is_empty() {
        return Err(ValidationError::NothingToUpdate.into());
    }

    let updated = state
        .store()
        .update(Collection::RitualServices, id, &Patch::from_set(set))
        .await?
        .ok_or_else(|| ApiError::NotFound("Ritual service not found".into()))?;
    tracing::info!(service = %updated.id, "ritual service updated");
    Ok(Json(service_view(&updated)))
}

async fn login(State(state): State<AppState>, ApiJson(body): ApiJson<Value>) -> ApiResult<Json<Value>> {
    let body = into_object(body)?;
    let login = require_str(&body, "login")?;
    let password = require_str(&body, "password")?;

    let service = state
        .store()
        .find_one(Collection::RitualServices, &Filter::eq("login", login.as_str()))
        .await?;
    let Some(service) = service.filter(|doc| {
        doc.str_field("passwordHash")
            .is_some_and(|hash| verify_password(hash, &password))
    }) else {
        tracing::info!(%login, "ritual service login rejected");
        return Err(ApiError::Unauthorized("Invalid login or password".into()));
    };

    let token = state.jwt().issue(service.id, Utc::now())?;
    Ok(Json(json!({ "token": token, "id": service.id.to_string() })))
}

async fn verify_token(State(state): State<AppState>, ApiJson(body): ApiJson<Value>) -> ApiResult<Json<Value>> {
    let body = into_object(body)?;
    let token = require_str(&body, "token")?;
    let id = state.jwt().verify(&token)?;
    Ok(Json(json!({ "valid": true, "id": id.to_string() })))
}
