//! Cemetery lookups: autocomplete over the area table and the display pages.
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use memoria_core::document::{Collection, Document};
use memoria_core::query::{distinct_values, unique_cemeteries, CemeteryListing, Filter, LISTING_LIMIT};
use serde::Deserialize;
use serde_json::{json, Value};

use super::param;
use crate::error::{parse_id, ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/cemeteries", get(cemetery_names))
        .route("/api/cemeteries/unique", get(unique_cemetery_names))
        .route("/api/cemeteries_page", get(cemetery_pages))
        .route("/api/cemeteries_page/{id}", get(cemetery_page))
}

#[derive(Debug, Deserialize)]
pub struct CemeteryQuery {
    pub area: Option<String>,
    pub search: Option<String>,
}

fn area_filter(query: &CemeteryQuery) -> Filter {
    let mut filters = Vec::new();
    if let Some(area) = param(&query.area) {
        filters.push(Filter::contains("area", area));
    }
    if let Some(search) = param(&query.search) {
        filters.push(Filter::contains("cemetries", search));
    }
    Filter::all_of(filters)
}

async fn cemetery_names(
    State(state): State<AppState>,
    Query(query): Query<CemeteryQuery>,
) -> ApiResult<Json<Vec<String>>> {
    let areas = state
        .store()
        .find(Collection::Areas, &area_filter(&query), Default::default())
        .await?;
    Ok(Json(distinct_values(
        &areas,
        "cemetries",
        param(&query.search),
        LISTING_LIMIT,
    )))
}

/// Like [`cemetery_names`] but keeps the owning area, so two areas with an
/// identically named cemetery list it twice.
async fn unique_cemetery_names(
    State(state): State<AppState>,
    Query(query): Query<CemeteryQuery>,
) -> ApiResult<Json<Vec<CemeteryListing>>> {
    let areas = state
        .store()
        .find(Collection::Areas, &area_filter(&query), Default::default())
        .await?;
    Ok(Json(unique_cemeteries(
        &areas,
        param(&query.search),
        LISTING_LIMIT,
    )))
}

fn page_view(doc: &Document) -> Value {
    json!({
        "id": doc.id.to_string(),
        "name": doc.field_or_null("name"),
        "image": doc.field_or_null("image"),
        "address": doc.field_or_null("address"),
        "phone": doc.field_or_null("phone"),
        "description": doc.field_or_null("description"),
        "area": doc.field_or_null("area"),
        "areaId": doc.field_or_null("areaId"),
    })
}

async fn cemetery_pages(
    State(state): State<AppState>,
    Query(query): Query<CemeteryQuery>,
) -> ApiResult<Json<Vec<Value>>> {
    let mut filters = Vec::new();
    if let Some(area) = param(&query.area) {
        filters.push(Filter::contains("area", area));
    }
    if let Some(search) = param(&query.search) {
        filters.push(Filter::contains("name", search));
    }
    let docs = state
        .store()
        .find(Collection::Cemeteries, &Filter::all_of(filters), Default::default())
        .await?;
    Ok(Json(docs.iter().map(page_view).collect()))
}

async fn cemetery_page(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "cemetery")?;
    let doc = state
        .store()
        .get(Collection::Cemeteries, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Cemetery not found".into()))?;
    Ok(Json(page_view(&doc)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use memoria_core::document::Collection;
    use serde_json::json;

    use crate::test_support::TestApp;

    async fn seeded() -> TestApp {
        let app = TestApp::new();
        app.seed(
            Collection::Areas,
            json!({"area": "Львів", "areaId": "702550", "cemetries": ["Личаківське", "Янівське", "Центральне"]}),
        )
        .await;
        app.seed(
            Collection::Areas,
            json!({"area": "Самбір", "areaId": "694864", "cemetries": ["Центральне"]}),
        )
        .await;
        app
    }

    #[tokio::test]
    async fn names_are_distinct_across_areas() {
        let app = seeded().await;
        let (status, body) = app.get("/api/cemeteries").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["Личаківське", "Центральне", "Янівське"]));

        let (_, body) = app.get("/api/cemeteries?area=%D0%BB%D1%8C%D0%B2%D1%96%D0%B2").await;
        assert_eq!(body, json!(["Личаківське", "Центральне", "Янівське"]));
    }

    #[tokio::test]
    async fn unique_listing_keeps_one_entry_per_area() {
        let app = seeded().await;
        let (status, body) = app
            .get("/api/cemeteries/unique?search=%D1%86%D0%B5%D0%BD%D1%82%D1%80")
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                {"name": "Центральне", "area": "Львів", "areaId": "702550"},
                {"name": "Центральне", "area": "Самбір", "areaId": "694864"}
            ])
        );
    }

    #[tokio::test]
    async fn pages_are_searchable_and_fetchable() {
        let app = TestApp::new();
        let id = app
            .seed(
                Collection::Cemeteries,
                json!({"name": "Личаківський цвинтар", "address": "вул. Мечникова, 33", "area": "Львів"}),
            )
            .await;
        app.seed(Collection::Cemeteries, json!({"name": "Байкове кладовище", "area": "Київ"}))
            .await;

        let (_, body) = app.get("/api/cemeteries_page?area=%D0%9B%D1%8C%D0%B2%D1%96%D0%B2").await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], id.to_string());

        let (status, body) = app.get(&format!("/api/cemeteries_page/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["address"], "вул. Мечникова, 33");

        let (status, _) = app.get("/api/cemeteries_page/bogus").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
