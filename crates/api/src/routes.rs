use crate::envelope::{
    self, success, ApiError, Data, Messages, Success, HOT_ITEMS, PREDICT, PRICE_DATA, SALES_DATA,
    SEARCH, STYLE_PRICE,
};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use skinscope_core::llm::{self, ForecastClient, ForecastRequest};
use skinscope_core::market::sales::{fetch_sales_bundle, SalesBundle};
use skinscope_core::market::types::{id_to_string, ItemSnapshot, Platform, SearchResult, SeriesSummary};
use skinscope_core::market::{MarketDataClient, HOT_LIST_PAGE_SIZE};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub market: Arc<dyn MarketDataClient>,
    pub forecaster: Arc<dyn ForecastClient>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/search-item", get(search_item))
        .route("/api/price-data/:item_id", get(price_data))
        .route("/api/sales-data/:item_id", get(sales_data))
        .route("/api/hot-items", get(hot_items))
        .route("/api/predict-price", post(predict_price))
        .route("/api/doppler-price", post(doppler_price))
        // Must follow the routes: it only applies to those already registered.
        .method_not_allowed_fallback(envelope::not_found)
        .fallback(envelope::not_found)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(envelope::handle_panic))
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

fn parse_item_id(raw: &str, messages: &Messages) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::validation(messages))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: Option<String>,
}

async fn search_item(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Success<Data<Vec<SearchResult>>>>, ApiError> {
    let Query(params) = params.map_err(|_| ApiError::validation(&SEARCH))?;
    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::validation(&SEARCH))?;

    let items = state
        .market
        .search_items(query)
        .await
        .map_err(|e| ApiError::upstream(e, &SEARCH))?;

    tracing::debug!(query, results = items.len(), "search completed");
    Ok(success(Data { data: items }))
}

async fn price_data(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<Json<Success<Data<ItemSnapshot>>>, ApiError> {
    let item_id = parse_item_id(&item_id, &PRICE_DATA)?;

    let snapshot = state
        .market
        .fetch_item_snapshot(item_id)
        .await
        .map_err(|e| ApiError::upstream(e, &PRICE_DATA))?;

    Ok(success(Data { data: snapshot }))
}

#[derive(Debug, Deserialize)]
struct SalesParams {
    platform: Option<String>,
}

async fn sales_data(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    params: Result<Query<SalesParams>, QueryRejection>,
) -> Result<Json<Success<SalesBundle>>, ApiError> {
    let item_id = parse_item_id(&item_id, &SALES_DATA)?;
    let Query(params) = params.map_err(|_| ApiError::validation(&SALES_DATA))?;
    let platform = match params.platform.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(p) => p
            .parse::<Platform>()
            .map_err(|_| ApiError::validation(&SALES_DATA))?,
        None => Platform::default(),
    };

    let bundle = fetch_sales_bundle(state.market.as_ref(), item_id, platform).await;
    if !bundle.missing.is_empty() {
        tracing::info!(item_id, missing = ?bundle.missing, "returning partial sales data");
    }
    Ok(success(bundle))
}

async fn hot_items(
    State(state): State<AppState>,
) -> Result<Json<Success<Data<Vec<SeriesSummary>>>>, ApiError> {
    let rows = state
        .market
        .fetch_hot_list(1, HOT_LIST_PAGE_SIZE)
        .await
        .map_err(|e| ApiError::upstream(e, &HOT_ITEMS))?;

    Ok(success(Data { data: rows }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictBody {
    price_data: Option<Value>,
    item_name: Option<String>,
    sales_data: Option<Value>,
}

#[derive(Debug, Serialize)]
struct Prediction {
    prediction: String,
}

async fn predict_price(
    State(state): State<AppState>,
    body: Result<Json<PredictBody>, JsonRejection>,
) -> Result<Json<Success<Prediction>>, ApiError> {
    let Json(body) = body.map_err(|e| {
        tracing::debug!(error = %e, "rejected forecast body");
        ApiError::validation(&PREDICT)
    })?;

    let item_name = body
        .item_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::validation(&PREDICT))?;
    let price_data = body.price_data.ok_or_else(|| ApiError::validation(&PREDICT))?;
    let goods_info = ItemSnapshot(price_data).goods_info().map_err(|e| {
        tracing::debug!(error = %e, "forecast body has no usable snapshot");
        ApiError::validation(&PREDICT)
    })?;

    // Series are optional context; a malformed payload is ignored.
    let sales = body
        .sales_data
        .and_then(|v| serde_json::from_value::<SalesBundle>(v).ok());

    let req = ForecastRequest {
        goods_info,
        item_name,
        sales,
    };
    let prediction = llm::forecast(state.forecaster.as_ref(), &req)
        .await
        .map_err(|e| ApiError::upstream(e, &PREDICT))?;

    Ok(success(Prediction { prediction }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StylePriceBody {
    item_id: Option<Value>,
    style: Option<Value>,
}

#[derive(Debug, Serialize)]
struct StylePrice {
    price: f64,
}

async fn doppler_price(
    State(state): State<AppState>,
    body: Result<Json<StylePriceBody>, JsonRejection>,
) -> Result<Json<Success<StylePrice>>, ApiError> {
    let Json(body) = body.map_err(|_| ApiError::validation(&STYLE_PRICE))?;

    let item_id = body
        .item_id
        .as_ref()
        .and_then(id_to_string)
        .ok_or_else(|| ApiError::validation(&STYLE_PRICE))?;
    let item_id = parse_item_id(&item_id, &STYLE_PRICE)?;
    let style = body
        .style
        .as_ref()
        .and_then(id_to_string)
        .ok_or_else(|| ApiError::validation(&STYLE_PRICE))?;

    let price = state
        .market
        .fetch_style_price(item_id, &style)
        .await
        .map_err(|e| ApiError::upstream(e, &STYLE_PRICE))?;

    Ok(success(StylePrice { price }))
}
