//! API route definitions

mod crawl;
mod health;
mod news;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json, Router};
use tracing::error;

use crate::AppState;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(crawl::routes())
        .merge(news::routes())
        .merge(health::routes())
}

/// Log a failed trigger and turn it into a `500` with a JSON error body
pub(crate) fn internal_error(context: &str, e: impl std::fmt::Display) -> Response {
    error!("{}: {}", context, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": format!("{}: {}", context, e)
        })),
    )
        .into_response()
}
