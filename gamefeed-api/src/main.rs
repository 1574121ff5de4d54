//! Game News Feed API Server
//!
//! HTTP triggers for crawling gaming news feeds, maintaining the live store
//! and reviewing keyword candidates for unmatched headlines.

mod routes;

use axum::{
    http::{header, Method},
    Router,
};
use gamefeed_services::{CrawlService, ServiceConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub crawl_service: Arc<CrawlService>,
    /// Held for the duration of a crawl so runs never overlap
    pub crawl_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(crawl_service: CrawlService) -> Self {
        Self {
            crawl_service: Arc::new(crawl_service),
            crawl_lock: Arc::new(Mutex::new(())),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,gamefeed_api=debug")),
        )
        .init();

    info!("Starting Game News Feed API");

    let config = ServiceConfig::from_env()?;
    info!("Using database at: {}", config.database_path.display());
    info!("Archiving expired news to: {}", config.archive_dir.display());

    let crawl_interval = config.crawl_interval;
    let state = AppState::new(CrawlService::new(config)?);

    match crawl_interval {
        Some(period) => spawn_scheduled_crawls(state.clone(), period),
        None => info!("CRAWL_INTERVAL_SECS not set - crawls run only on request"),
    }

    // Configure CORS for the admin frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = router(state).layer(cors).layer(TraceLayer::new_for_http());

    // Start server
    let port = std::env::var("SERVER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router with all API routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::api_routes())
        .with_state(state)
}

/// Crawl, dedupe and expire on a fixed period
///
/// A tick that finds a crawl already running (e.g. one triggered over HTTP)
/// is skipped.
fn spawn_scheduled_crawls(state: AppState, period: Duration) {
    info!("Scheduling crawls every {}s", period.as_secs());

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let Ok(_guard) = state.crawl_lock.try_lock() else {
                warn!("Previous crawl still running, skipping scheduled run");
                continue;
            };

            let service = &state.crawl_service;
            if let Err(e) = service.crawl().await {
                error!("Scheduled crawl failed: {}", e);
                continue;
            }
            if let Err(e) = service.dedupe() {
                error!("Scheduled dedupe failed: {}", e);
            }
            if let Err(e) = service.expire(None) {
                error!("Scheduled expiry failed: {}", e);
            }
        }
    });
}
