//! Crawl orchestration
//!
//! A crawl run fetches every source concurrently under a shared deadline,
//! then normalizes, matches and stores each document in turn. The service
//! also exposes the maintenance triggers (dedupe, expire, re-match) and the
//! keyword reports built on the stored unmatched items.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use gamefeed_core::{FeedItem, FeedSource, KeywordReport, PlatformEntry, TitleSuggestion};
use gamefeed_news::{default_sources, load_sources, normalize, FeedFetcher, NewsError};

use crate::archive::Archive;
use crate::config::ServiceConfig;
use crate::entity_matcher::{enrich_unmatched, match_platforms, EnrichReport, GameMatcher};
use crate::feed_store::{retention_cutoff, ExpireReport, FeedStore, FeedStoreError, UpsertOutcome};
use crate::keyword_engine::infer_keywords;
use crate::title_suggester::{
    load_classification, suggest_game_titles, ClassificationError, SUGGESTION_WINDOW_HOURS,
};

/// Errors that abort a crawl or a maintenance trigger
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("Store error: {0}")]
    Store(#[from] FeedStoreError),

    #[error("Feed error: {0}")]
    News(#[from] NewsError),

    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),
}

/// Per-source ingestion counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub source: String,
    /// Items read from the document
    pub seen: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Stored items that matched a catalog game
    pub matched: usize,
    /// Items dropped for a missing field or bad date
    pub skipped: usize,
    /// Items older than the retention cutoff
    pub too_old: usize,
    /// Ingestion stopped at the first too-old item
    pub stopped_early: bool,
}

/// A source that produced no items this run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub error: String,
}

/// Result of one crawl run
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub started_at: DateTime<Utc>,
    pub sources: Vec<SourceSummary>,
    pub failed_sources: Vec<SourceFailure>,
    pub platform_links: usize,
    pub elapsed_ms: u64,
}

impl CrawlReport {
    pub fn inserted(&self) -> usize {
        self.sources.iter().map(|s| s.inserted).sum()
    }

    pub fn updated(&self) -> usize {
        self.sources.iter().map(|s| s.updated).sum()
    }
}

/// Runs crawls and maintenance over the shared store
pub struct CrawlService {
    fetcher: FeedFetcher,
    store: Arc<FeedStore>,
    archive: Archive,
    sources: Vec<FeedSource>,
    config: ServiceConfig,
}

impl CrawlService {
    /// Open the store and load the source registry described by `config`
    pub fn new(config: ServiceConfig) -> Result<Self, CrawlError> {
        let store = Arc::new(FeedStore::new(&config.database_path)?);
        let sources = match &config.feed_sources_path {
            Some(path) => load_sources(path)?,
            None => default_sources(),
        };
        let fetcher = FeedFetcher::new(&config.fetcher_config())?;
        let archive = Archive::new(&config.archive_dir);

        info!(
            "Crawl service ready with {} sources, {} day retention",
            sources.len(),
            config.retention_days
        );
        Ok(Self::with_parts(fetcher, store, archive, sources, config))
    }

    pub fn with_parts(
        fetcher: FeedFetcher,
        store: Arc<FeedStore>,
        archive: Archive,
        sources: Vec<FeedSource>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            fetcher,
            store,
            archive,
            sources,
            config,
        }
    }

    pub fn store(&self) -> &Arc<FeedStore> {
        &self.store
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Fetch, normalize, match and store every source
    #[instrument(skip(self))]
    pub async fn crawl(&self) -> Result<CrawlReport, CrawlError> {
        let started = Instant::now();
        let started_at = Utc::now();
        let cutoff = retention_cutoff(started_at, self.config.retention_days)?;
        let catalog = self.store.load_catalog()?;
        let matcher = GameMatcher::new(&catalog);

        let deadline = tokio::time::Instant::now() + self.config.crawl_deadline;
        let fetches = self.sources.iter().map(|source| async move {
            let result = tokio::time::timeout_at(deadline, self.fetcher.fetch(source)).await;
            (source, result)
        });
        let documents = join_all(fetches).await;

        let mut report = CrawlReport {
            started_at,
            sources: Vec::new(),
            failed_sources: Vec::new(),
            platform_links: 0,
            elapsed_ms: 0,
        };

        for (source, result) in documents {
            let raw = match result {
                Ok(Ok(raw)) => raw,
                Ok(Err(e)) => {
                    warn!("Failed to fetch feed {}: {}", source.name, e);
                    report.failed_sources.push(SourceFailure {
                        source: source.name.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
                Err(_) => {
                    warn!("Feed {} missed the crawl deadline", source.name);
                    report.failed_sources.push(SourceFailure {
                        source: source.name.clone(),
                        error: "crawl deadline exceeded".to_string(),
                    });
                    continue;
                }
            };

            match self.ingest(source, &raw, &matcher, &catalog.platforms, cutoff) {
                Ok((summary, links)) => {
                    report.platform_links += links;
                    report.sources.push(summary);
                }
                Err(CrawlError::News(e)) => {
                    warn!("Skipping unreadable feed {}: {}", source.name, e);
                    report.failed_sources.push(SourceFailure {
                        source: source.name.clone(),
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    error!("Crawl aborted while storing {}: {}", source.name, e);
                    return Err(e);
                }
            }
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            "Crawl finished: {} inserted, {} updated, {} sources failed in {}ms",
            report.inserted(),
            report.updated(),
            report.failed_sources.len(),
            report.elapsed_ms
        );
        Ok(report)
    }

    fn ingest(
        &self,
        source: &FeedSource,
        raw: &[u8],
        matcher: &GameMatcher,
        platforms: &[PlatformEntry],
        cutoff: DateTime<Utc>,
    ) -> Result<(SourceSummary, usize), CrawlError> {
        let items = normalize(raw, source)?;
        let mut summary = SourceSummary {
            source: source.name.clone(),
            ..Default::default()
        };
        let mut links = 0;

        for item in items {
            summary.seen += 1;

            let mut item = match item {
                Ok(item) => item,
                Err(e) => {
                    warn!("Skipping item from {}: {}", source.name, e);
                    summary.skipped += 1;
                    continue;
                }
            };

            if item.published_at < cutoff {
                summary.too_old += 1;
                if source.newest_first {
                    summary.stopped_early = true;
                    break;
                }
                continue;
            }

            item.game_id = matcher.find(&item.title);
            if let Some(game_id) = item.game_id {
                summary.matched += 1;
                for platform_id in match_platforms(&item.categories_string(), platforms) {
                    if self.store.link_game_platform(game_id, platform_id)? {
                        links += 1;
                    }
                }
            }

            match self.store.upsert(&item)? {
                UpsertOutcome::Inserted => summary.inserted += 1,
                UpsertOutcome::Updated => summary.updated += 1,
            }
        }

        debug!(
            "{}: {} seen, {} inserted, {} updated, {} skipped, {} too old",
            source.name,
            summary.seen,
            summary.inserted,
            summary.updated,
            summary.skipped,
            summary.too_old
        );
        Ok((summary, links))
    }

    /// Remove duplicate headlines from the live store
    pub fn dedupe(&self) -> Result<usize, CrawlError> {
        Ok(self.store.dedupe()?)
    }

    /// Archive and remove items past the retention window
    pub fn expire(&self, retention_days: Option<i64>) -> Result<ExpireReport, CrawlError> {
        let days = retention_days.unwrap_or(self.config.retention_days);
        Ok(self.store.expire(&self.archive, days, Utc::now())?)
    }

    pub fn unmatched(&self) -> Result<Vec<FeedItem>, CrawlError> {
        Ok(self.store.unmatched()?)
    }

    /// Re-run game matching over stored unmatched items
    pub fn match_unmatched(&self) -> Result<EnrichReport, CrawlError> {
        let catalog = self.store.load_catalog()?;
        Ok(enrich_unmatched(&self.store, &catalog)?)
    }

    /// Keyword candidates over the unmatched headlines
    ///
    /// Matching is re-run first so headlines about catalog games added since
    /// the last crawl do not show up as candidates.
    #[instrument(skip(self))]
    pub fn keyword_candidates(&self) -> Result<KeywordReport, CrawlError> {
        let catalog = self.store.load_catalog()?;
        enrich_unmatched(&self.store, &catalog)?;

        let headlines: Vec<String> = self
            .store
            .unmatched()?
            .into_iter()
            .map(|item| item.title)
            .collect();

        Ok(infer_keywords(&headlines, &catalog))
    }

    /// Title suggestions for unmatched items of the last 48 hours
    pub fn suggest_titles(&self) -> Result<Vec<TitleSuggestion>, CrawlError> {
        let classification = load_classification(&self.config.keywords_path)?;
        let now = Utc::now();
        let recent = self
            .store
            .unmatched_since(now - Duration::hours(SUGGESTION_WINDOW_HOURS))?;

        Ok(suggest_game_titles(&recent, &classification, now))
    }
}
