//! News maintenance and review endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use gamefeed_services::MAX_RETENTION_DAYS;
use serde::Deserialize;
use tracing::info;

use super::internal_error;
use crate::AppState;

/// Query parameters for expiring news
#[derive(Debug, Deserialize)]
pub struct ExpireQuery {
    /// Retention window in days; defaults to RETENTION_DAYS
    pub days: Option<i64>,
}

/// Query parameters for listing unmatched news
#[derive(Debug, Deserialize)]
pub struct UnmatchedQuery {
    /// Maximum number of results
    pub limit: Option<usize>,
}

/// Create news routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/news/dedupe", post(dedupe_news))
        .route("/news/expire", post(expire_news))
        .route("/news/unmatched", get(get_unmatched_news))
        .route("/news/match", post(match_news))
        .route("/news/keywords", get(get_keyword_candidates))
        .route("/news/suggestions", get(get_title_suggestions))
}

/// POST /api/news/dedupe - Delete items whose title was already ingested
async fn dedupe_news(State(state): State<AppState>) -> impl IntoResponse {
    match state.crawl_service.dedupe() {
        Ok(removed) => {
            info!("Dedupe removed {} items", removed);
            (StatusCode::OK, Json(serde_json::json!({ "removed": removed }))).into_response()
        }
        Err(e) => internal_error("Dedupe failed", e),
    }
}

/// POST /api/news/expire - Archive and remove news past the retention window
async fn expire_news(
    State(state): State<AppState>,
    Query(params): Query<ExpireQuery>,
) -> impl IntoResponse {
    if matches!(params.days, Some(days) if !(0..=MAX_RETENTION_DAYS).contains(&days)) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": format!("days must be between 0 and {}", MAX_RETENTION_DAYS)
            })),
        )
            .into_response();
    }

    match state.crawl_service.expire(params.days) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => internal_error("Expiry failed", e),
    }
}

/// GET /api/news/unmatched - Items without a matched game, newest first
async fn get_unmatched_news(
    State(state): State<AppState>,
    Query(params): Query<UnmatchedQuery>,
) -> impl IntoResponse {
    match state.crawl_service.unmatched() {
        Ok(mut items) => {
            if let Some(limit) = params.limit {
                items.truncate(limit);
            }
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => internal_error("Failed to list unmatched news", e),
    }
}

/// POST /api/news/match - Re-run game matching over unmatched items
async fn match_news(State(state): State<AppState>) -> impl IntoResponse {
    match state.crawl_service.match_unmatched() {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => internal_error("Matching failed", e),
    }
}

/// GET /api/news/keywords - Probable game titles mined from unmatched headlines
async fn get_keyword_candidates(State(state): State<AppState>) -> impl IntoResponse {
    match state.crawl_service.keyword_candidates() {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => internal_error("Keyword inference failed", e),
    }
}

/// GET /api/news/suggestions - Title suggestions for recent unmatched items
async fn get_title_suggestions(State(state): State<AppState>) -> impl IntoResponse {
    match state.crawl_service.suggest_titles() {
        Ok(suggestions) => (StatusCode::OK, Json(suggestions)).into_response(),
        Err(e) => internal_error("Title suggestion failed", e),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{body_json, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, Utc};
    use gamefeed_core::NewFeedItem;
    use tower::ServiceExt;

    use crate::AppState;

    fn seed(state: &AppState, title: &str, url: &str, days_old: i64) {
        state
            .crawl_service
            .store()
            .upsert(&NewFeedItem {
                title: title.to_string(),
                url: url.to_string(),
                site: "gamed".to_string(),
                published_at: Utc::now() - Duration::days(days_old),
                categories: vec![],
                game_id: None,
            })
            .unwrap();
    }

    async fn send(state: AppState, method: &str, uri: &str) -> axum::response::Response {
        crate::router(state)
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_dedupe_and_unmatched() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        seed(&state, "Zelda getest", "https://a.nl/1", 0);
        seed(&state, "Zelda getest", "https://b.nl/1", 0);
        seed(&state, "Mario Kart nieuws", "https://a.nl/2", 1);

        let response = send(state.clone(), "POST", "/api/news/dedupe").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["removed"], 1);

        let response = send(state.clone(), "GET", "/api/news/unmatched?limit=1").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "Zelda getest");
    }

    #[tokio::test]
    async fn test_expire_with_days() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        seed(&state, "Oud", "https://a.nl/1", 5);

        let response = send(state.clone(), "POST", "/api/news/expire?days=3").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["deleted"], 1);
        assert_eq!(body["archived"], 1);

        let response = send(state, "POST", "/api/news/expire?days=-1").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_expire_with_huge_days_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        seed(&state, "Oud", "https://a.nl/1", 5);

        let response = send(state.clone(), "POST", "/api/news/expire?days=100000000").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
        assert_eq!(state.crawl_service.store().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_expire_with_corrupt_archive_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let published = Utc::now() - Duration::days(20);
        std::fs::write(
            dir.path().join(format!("{}.json", published.format("%Y-%m"))),
            "[{broken",
        )
        .unwrap();
        seed(&state, "Oud", "https://a.nl/1", 20);

        let response = send(state.clone(), "POST", "/api/news/expire").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_json(response).await["error"].is_string());
        assert_eq!(state.crawl_service.store().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_match_and_keywords() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        seed(&state, "Sonic Frontiers uitgesteld", "https://a.nl/1", 0);
        seed(&state, "Nieuwe beelden Sonic Frontiers", "https://a.nl/2", 0);
        seed(&state, "Astro Bot getest", "https://a.nl/3", 0);
        state
            .crawl_service
            .store()
            .insert_game("Astro Bot", None)
            .unwrap();

        let response = send(state.clone(), "POST", "/api/news/match").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["matched"], 1);

        let response = send(state.clone(), "GET", "/api/news/keywords").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["headline_count"], 2);
        assert_eq!(body["candidates"][0]["snippet"], "sonic frontiers");
        assert_eq!(body["candidates"][0]["occurrences"], 2);

        let response = send(state, "GET", "/api/news/suggestions").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);
    }
}
