use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chainlens_core::dispatch::{AggregatedResult, DispatchEngine};
use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;

/// `GET /api/v1/blocks/latest/{chain}`
pub async fn handle_latest_block(
    State(engine): State<Arc<DispatchEngine>>,
    Path(chain): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(engine.get_latest_block(&chain).await?))
}

/// `GET /api/v1/blocks/latest/` with no chain segment.
pub async fn handle_latest_block_missing(
    State(engine): State<Arc<DispatchEngine>>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(engine.get_latest_block("").await?))
}

/// `GET /api/v1/tx/total/{chain}`
pub async fn handle_total_tx(
    State(engine): State<Arc<DispatchEngine>>,
    Path(chain): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let total = engine.count_total_tx_last_24h(&chain).await?;
    Ok(Json(serde_json::json!({ "total": total })))
}

/// `GET /api/v1/tx/total/` with no chain segment.
pub async fn handle_total_tx_missing(
    State(engine): State<Arc<DispatchEngine>>,
) -> Result<Json<Value>, ApiError> {
    let total = engine.count_total_tx_last_24h("").await?;
    Ok(Json(serde_json::json!({ "total": total })))
}

/// `GET /api/v1/tx/{hash}`. An empty result is a 404.
pub async fn handle_search(
    State(engine): State<Arc<DispatchEngine>>,
    Path(hash): Path<String>,
) -> Result<Json<AggregatedResult>, ApiError> {
    let result = engine.search_transaction_hash(&hash).await?;
    if result.is_empty() {
        return Err(ApiError::TransactionNotFound(hash));
    }
    Ok(Json(result))
}

/// `GET /api/v1/tx/` with no hash segment.
pub async fn handle_search_missing(
    State(engine): State<Arc<DispatchEngine>>,
) -> Result<Json<AggregatedResult>, ApiError> {
    Ok(Json(engine.search_transaction_hash("").await?))
}

/// Prometheus text exposition.
pub async fn handle_metrics(State(engine): State<Arc<DispatchEngine>>) -> impl IntoResponse {
    let body = engine.context().metrics_collector.get_prometheus_metrics();
    (StatusCode::OK, [("content-type", "text/plain; version=0.0.4")], body)
}

pub async fn handle_health(State(engine): State<Arc<DispatchEngine>>) -> impl IntoResponse {
    let ctx = engine.context();
    let chains: Vec<&'static str> = ctx.registry.iter().map(|d| d.id().as_str()).collect();

    let health_status = serde_json::json!({
        "status": "healthy",
        "chains": chains,
        "cache_backend": ctx.cache.backend_name(),
        "requests": ctx.metrics_collector.summary(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    });

    (StatusCode::OK, Json(health_status))
}
