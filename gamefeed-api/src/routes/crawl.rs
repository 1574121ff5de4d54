//! Crawl trigger

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use tracing::info;

use super::internal_error;
use crate::AppState;

/// Create crawl routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/crawl", post(run_crawl))
}

/// POST /api/crawl - Fetch every source and store new items
///
/// Returns `409 Conflict` while another crawl is running.
async fn run_crawl(State(state): State<AppState>) -> impl IntoResponse {
    let Ok(_guard) = state.crawl_lock.try_lock() else {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": "A crawl is already running"
            })),
        )
            .into_response();
    };

    info!("Crawl triggered over HTTP");
    match state.crawl_service.crawl().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => internal_error("Crawl failed", e),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{body_json, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_crawl_without_sources() {
        let dir = tempfile::tempdir().unwrap();
        let app = crate::router(test_state(dir.path()));

        let response = app
            .oneshot(Request::post("/api/crawl").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["sources"].as_array().unwrap().len(), 0);
        assert_eq!(body["failed_sources"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_crawl_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let _running = state.crawl_lock.clone().try_lock_owned().unwrap();
        let app = crate::router(state);

        let response = app
            .oneshot(Request::post("/api/crawl").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
