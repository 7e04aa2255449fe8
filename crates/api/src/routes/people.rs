use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::Utc;
use memoria_core::document::validate::{optional_str, pick_fields, require_str, FieldKind, ValidationError};
use memoria_core::document::{Collection, Document};
use memoria_core::mutation::Patch;
use memoria_core::normalize::{self, expand_photos, expand_relatives, validate_photos, validate_relatives};
use memoria_core::query::{area_head, Filter};
use serde::Deserialize;
use serde_json::{json, Value};

use super::premium::{authorize_owner, PremiumAccount};
use super::{into_object, param};
use crate::error::{parse_id, ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

/// Plain person fields a client may overwrite.
const EDITABLE_FIELDS: &[(&str, FieldKind)] = &[
    ("name", FieldKind::Text),
    ("birthYear", FieldKind::Integer),
    ("birthDate", FieldKind::Text),
    ("deathYear", FieldKind::Integer),
    ("deathDate", FieldKind::Text),
    ("notable", FieldKind::Bool),
    ("avatarUrl", FieldKind::Text),
    ("portraitUrl", FieldKind::Text),
    ("area", FieldKind::Text),
    ("areaId", FieldKind::Text),
    ("cemetery", FieldKind::Text),
    ("location", FieldKind::Structured),
    ("bio", FieldKind::Text),
];

/// Media fields validated item by item.
const MEDIA_FIELDS: &[&str] = &["photos", "sharedPhotos", "sharedPending"];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/people", get(search_people))
        .route("/api/people/{id}", get(get_person).put(update_person))
        .route("/api/people/{id}/shared-photos", post(share_photos))
        .route("/api/people/{id}/comments", post(add_comment))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeopleQuery {
    pub search: Option<String>,
    pub birth_year: Option<String>,
    pub death_year: Option<String>,
    pub area: Option<String>,
    pub area_id: Option<String>,
    pub cemetery: Option<String>,
}

/// Year parameters count only when they are all digits.
fn year(value: &Option<String>) -> Option<u64> {
    param(value)
        .filter(|s| s.chars().all(|c| c.is_ascii_digit()))
        .and_then(|s| s.parse().ok())
}

pub(crate) fn people_filter(query: &PeopleQuery) -> Filter {
    let mut filters = Vec::new();
    if let Some(name) = param(&query.search) {
        filters.push(Filter::contains("name", name));
    }
    if let Some(birth) = year(&query.birth_year) {
        filters.push(Filter::eq("birthYear", birth));
    }
    if let Some(death) = year(&query.death_year) {
        filters.push(Filter::eq("deathYear", death));
    }
    match (param(&query.area_id), param(&query.area)) {
        (Some(area_id), Some(area)) => filters.push(Filter::Or(vec![
            Filter::eq("areaId", area_id),
            Filter::contains("area", area_head(area)),
        ])),
        (Some(area_id), None) => filters.push(Filter::eq("areaId", area_id)),
        (None, Some(area)) => filters.push(Filter::contains("area", area)),
        (None, None) => {}
    }
    if let Some(cemetery) = param(&query.cemetery) {
        filters.push(Filter::contains("cemetery", cemetery));
    }
    Filter::all_of(filters)
}

fn summary_view(doc: &Document) -> Value {
    json!({
        "id": doc.id.to_string(),
        "name": doc.field_or_null("name"),
        "birthYear": doc.field_or_null("birthYear"),
        "deathYear": doc.field_or_null("deathYear"),
        "notable": doc.field_or_null("notable"),
        "avatarUrl": doc.field_or_null("avatarUrl"),
        "area": doc.field_or_null("area"),
        "areaId": doc.field_or_null("areaId"),
        "cemetery": doc.field_or_null("cemetery"),
    })
}

/// Full person as returned to clients. Media and relatives are re-expanded
/// from whatever shape is stored; the premium sub-document is reduced to a
/// flag so credentials never leave the server.
pub(crate) fn person_view(doc: &Document) -> Value {
    let media = |field: &str| normalize::media::to_values(&expand_photos(doc.get(field)));
    let comments = match doc.get("comments") {
        Some(Value::Array(items)) => Value::Array(items.clone()),
        _ => json!([]),
    };
    json!({
        "id": doc.id.to_string(),
        "name": doc.field_or_null("name"),
        "birthYear": doc.field_or_null("birthYear"),
        "birthDate": doc.field_or_null("birthDate"),
        "deathYear": doc.field_or_null("deathYear"),
        "deathDate": doc.field_or_null("deathDate"),
        "notable": doc.get("notable").cloned().unwrap_or(Value::Bool(false)),
        "avatarUrl": doc.field_or_null("avatarUrl"),
        "portraitUrl": doc.field_or_null("portraitUrl"),
        "area": doc.field_or_null("area"),
        "areaId": doc.field_or_null("areaId"),
        "cemetery": doc.field_or_null("cemetery"),
        "location": doc.field_or_null("location"),
        "bio": doc.field_or_null("bio"),
        "photos": media("photos"),
        "sharedPhotos": media("sharedPhotos"),
        "sharedPending": media("sharedPending"),
        "comments": comments,
        "relatives": normalize::relatives::to_values(&expand_relatives(doc.get("relatives"))),
        "premium": PremiumAccount::of(doc).is_some(),
    })
}

async fn load_person(state: &AppState, raw_id: &str) -> ApiResult<Document> {
    let id = parse_id(raw_id, "person")?;
    state
        .store()
        .get(Collection::People, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Person not found".into()))
}

async fn search_people(
    State(state): State<AppState>,
    Query(query): Query<PeopleQuery>,
) -> ApiResult<Json<Value>> {
    let filter = people_filter(&query);
    let docs = state
        .store()
        .find(Collection::People, &filter, Default::default())
        .await?;
    let people: Vec<Value> = docs.iter().map(summary_view).collect();
    Ok(Json(json!({ "total": people.len(), "people": people })))
}

async fn get_person(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let person = load_person(&state, &id).await?;
    Ok(Json(person_view(&person)))
}

async fn update_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Json<Value>> {
    let person = load_person(&state, &id).await?;
    authorize_owner(
        &person,
        bearer.as_ref().map(|TypedHeader(auth)| auth.token()),
        Utc::now(),
    )?;

    let body = into_object(body)?;
    let mut set = pick_fields(&body, EDITABLE_FIELDS)?;
    for field in MEDIA_FIELDS {
        match body.get(*field) {
            None => {}
            Some(Value::Null) => {
                set.insert((*field).to_string(), json!([]));
            }
            Some(value) => {
                let items = validate_photos(field, value)?;
                set.insert((*field).to_string(), normalize::media::to_values(&items));
            }
        }
    }
    match body.get("relatives") {
        None => {}
        Some(Value::Null) => {
            set.insert("relatives".into(), json!([]));
        }
        Some(value) => {
            let relatives = validate_relatives(value)?;
            set.insert("relatives".into(), normalize::relatives::to_values(&relatives));
        }
    }
    if set.is_empty() {
        return Err(ValidationError::NothingToUpdate.into());
    }

    let updated = state
        .store()
        .update(Collection::People, person.id, &Patch::from_set(set))
        .await?
        .ok_or_else(|| ApiError::NotFound("Person not found".into()))?;
    tracing::info!(person = %updated.id, "person updated");
    Ok(Json(person_view(&updated)))
}

/// Community-submitted media goes to `sharedPending` for review.
async fn share_photos(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let person = load_person(&state, &id).await?;
    let body = into_object(body)?;
    let photos = body
        .get("photos")
        .ok_or_else(|| ValidationError::Missing("photos".into()))?;
    let items = validate_photos("photos", photos)?;
    if items.is_empty() {
        return Err(ValidationError::Empty("photos".into()).into());
    }

    let patch = items
        .iter()
        .fold(Patch::new(), |patch, item| patch.push("sharedPending", item.to_value()));
    let updated = state
        .store()
        .update(Collection::People, person.id, &patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Person not found".into()))?;
    tracing::info!(person = %updated.id, count = items.len(), "shared media submitted");

    let pending = normalize::media::to_values(&expand_photos(updated.get("sharedPending")));
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": updated.id.to_string(), "sharedPending": pending })),
    ))
}

async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let person = load_person(&state, &id).await?;
    let body = into_object(body)?;
    let text = require_str(&body, "text")?;
    let author = optional_str(&body, "author")?.unwrap_or_else(|| "Анонім".to_string());

    let comment = json!({
        "author": author,
        "text": text,
        "createdAt": Utc::now().to_rfc3339(),
    });
    state
        .store()
        .update(Collection::People, person.id, &Patch::new().push("comments", comment.clone()))
        .await?
        .ok_or_else(|| ApiError::NotFound("Person not found".into()))?;
    Ok((StatusCode::CREATED, Json(comment)))
}
