use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    application::services::PerformanceSnapshot,
    infrastructure::http::middleware::{ApiError, ApiResult, AppState},
};

#[derive(Debug, Deserialize)]
pub struct InvalidateCacheRequest {
    pub pattern: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvalidateCacheResponse {
    pub pattern: String,
    pub invalidated: usize,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// GET /api/metrics/summary
pub async fn metrics_summary(State(state): State<AppState>) -> Json<PerformanceSnapshot> {
    Json(state.monitor.snapshot())
}

// POST /api/cache/invalidate
pub async fn invalidate_cache(
    State(state): State<AppState>,
    Json(request): Json<InvalidateCacheRequest>,
) -> ApiResult<Json<InvalidateCacheResponse>> {
    let pattern = request.pattern.trim();
    if pattern.is_empty() {
        return Err(ApiError::BadRequest("Pattern must not be empty".to_string()));
    }

    let invalidated = state.cache.invalidate(pattern);
    tracing::info!("Invalidated {} cache entries matching {}", invalidated, pattern);

    Ok(Json(InvalidateCacheResponse {
        pattern: pattern.to_string(),
        invalidated,
    }))
}
