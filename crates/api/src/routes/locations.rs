use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use memoria_core::document::Collection;
use memoria_core::query::{distinct_values, Filter, LISTING_LIMIT};
use serde::Deserialize;

use super::param;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/locations", get(locations))
}

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub search: Option<String>,
}

/// Area names for autocomplete: distinct, sorted, first ten.
async fn locations(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> ApiResult<Json<Vec<String>>> {
    let search = param(&query.search);
    let filter = search.map_or(Filter::All, |needle| Filter::contains("area", needle));
    let areas = state
        .store()
        .find(Collection::Areas, &filter, Default::default())
        .await?;
    Ok(Json(distinct_values(&areas, "area", search, LISTING_LIMIT)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use memoria_core::document::Collection;
    use serde_json::json;

    use crate::test_support::TestApp;

    #[tokio::test]
    async fn lists_matching_areas_once() {
        let app = TestApp::new();
        for area in ["Львів", "Самбір", "Львів", "", "Стрий"] {
            app.seed(Collection::Areas, json!({"area": area})).await;
        }

        let (status, body) = app.get("/api/locations").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["Львів", "Самбір", "Стрий"]));

        let (_, body) = app.get("/api/locations?search=%D1%81%D1%82%D1%80").await;
        assert_eq!(body, json!(["Стрий"]));
    }
}
