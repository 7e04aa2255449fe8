use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use memoria_core::document::validate::{optional_str, pick_fields, require_str, FieldKind};
use memoria_core::document::{Collection, Document};
use memoria_core::query::{Filter, FindOptions};
use serde_json::{json, Value};

use super::into_object;
use crate::error::{parse_id, ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/liturgies", post(order_liturgy))
        .route("/api/people/{id}/liturgies", get(person_liturgies))
}

fn liturgy_view(doc: &Document) -> Value {
    json!({
        "id": doc.id.to_string(),
        "personId": doc.field_or_null("personId"),
        "serviceDate": doc.field_or_null("serviceDate"),
        "serviceTime": doc.field_or_null("serviceTime"),
        "churchName": doc.field_or_null("churchName"),
        "price": doc.field_or_null("price"),
        "createdAt": doc.field_or_null("createdAt"),
    })
}

async fn order_liturgy(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = into_object(body)?;
    let person_id = parse_id(&require_str(&body, "personId")?, "person")?;
    let service_date = require_str(&body, "serviceDate")?;
    if state.store().get(Collection::People, person_id).await?.is_none() {
        return Err(ApiError::NotFound("Person not found".into()));
    }

    let mut content = pick_fields(&body, &[("price", FieldKind::Number)])?;
    content.insert("personId".into(), json!(person_id.to_string()));
    content.insert("serviceDate".into(), json!(service_date));
    for field in ["serviceTime", "churchName"] {
        if let Some(value) = optional_str(&body, field)? {
            content.insert(field.into(), json!(value));
        }
    }
    content.insert("createdAt".into(), json!(Utc::now().to_rfc3339()));

    let liturgy = state.store().insert(Collection::Liturgies, content).await?;
    tracing::info!(liturgy = %liturgy.id, person = %person_id, "liturgy ordered");
    Ok((StatusCode::CREATED, Json(liturgy_view(&liturgy))))
}

async fn person_liturgies(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Value>>> {
    let person_id = parse_id(&id, "person")?;
    let docs = state
        .store()
        .find(
            Collection::Liturgies,
            &Filter::eq("personId", person_id.to_string()),
            FindOptions::newest_first(),
        )
        .await?;
    Ok(Json(docs.iter().map(liturgy_view).collect()))
}
