//! Health check endpoints

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    sources: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    stored_items: Option<usize>,
    crawl_running: bool,
}

/// Health check handler; degraded when the store cannot be queried
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let stored_items = state.crawl_service.store().count().ok();
    let healthy = stored_items.is_some();

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        sources: state.crawl_service.sources().len(),
        stored_items,
        crawl_running: state.crawl_lock.try_lock().is_err(),
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(response))
}

/// Simple liveness check (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
}
