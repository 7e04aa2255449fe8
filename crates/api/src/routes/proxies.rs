//! Pass-through lookups: crypto market data, Nova Poshta, GeoNames.
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::param;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::gateways::Place;
use crate::state::AppState;

const DEFAULT_SETTLEMENT_LIMIT: u32 = 20;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/binance-p2p", post(binance_p2p))
        .route("/api/coin-icon", get(coin_icon))
        .route("/api/settlements", get(settlements))
        .route("/api/warehouses", get(warehouses))
        .route("/api/geocode", get(geocode))
}

/// Mirrors the Binance status code and body unchanged.
async fn binance_p2p(State(state): State<AppState>, ApiJson(body): ApiJson<Value>) -> ApiResult<Response> {
    let upstream = state.gateways().market.binance_p2p(&body).await?;
    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Body::from(upstream.body),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct CoinQuery {
    pub symbol: Option<String>,
}

async fn coin_icon(State(state): State<AppState>, Query(query): Query<CoinQuery>) -> ApiResult<Json<Value>> {
    let symbol = param(&query.symbol)
        .ok_or_else(|| ApiError::BadRequest("Missing 'symbol' parameter".into()))?
        .to_lowercase();
    let thumb = state
        .gateways()
        .market
        .coin_icon(&symbol)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No coin matches {symbol:?}")))?;
    Ok(Json(json!({ "icon_thumb": thumb })))
}

#[derive(Debug, Deserialize)]
pub struct SettlementQuery {
    pub q: Option<String>,
    pub limit: Option<u32>,
}

async fn settlements(
    State(state): State<AppState>,
    Query(query): Query<SettlementQuery>,
) -> ApiResult<Json<Value>> {
    let name = param(&query.q).ok_or_else(|| ApiError::BadRequest("q is required".into()))?;
    let limit = query.limit.unwrap_or(DEFAULT_SETTLEMENT_LIMIT).clamp(1, 500);
    Ok(Json(state.gateways().shipping.settlements(name, limit).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseQuery {
    pub city_ref: Option<String>,
    pub search: Option<String>,
}

async fn warehouses(
    State(state): State<AppState>,
    Query(query): Query<WarehouseQuery>,
) -> ApiResult<Json<Value>> {
    let city_ref =
        param(&query.city_ref).ok_or_else(|| ApiError::BadRequest("cityRef is required".into()))?;
    Ok(Json(
        state
            .gateways()
            .shipping
            .warehouses(city_ref, param(&query.search))
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub q: Option<String>,
}

async fn geocode(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> ApiResult<Json<Vec<Place>>> {
    let name = param(&query.q).ok_or_else(|| ApiError::BadRequest("q is required".into()))?;
    Ok(Json(state.gateways().geocoder.search(name).await?))
}
