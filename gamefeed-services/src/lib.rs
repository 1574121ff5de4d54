//! Business logic services for the game news pipeline
//!
//! This crate owns the ingestion store and its monthly archive, matches
//! headlines against the game catalog, infers candidate game titles for
//! unmatched headlines and orchestrates crawl runs.

pub mod archive;
pub mod config;
pub mod crawler;
pub mod entity_matcher;
pub mod feed_store;
pub mod keyword_engine;
pub mod title_suggester;

pub use archive::{AppendOutcome, Archive, ArchiveError};
pub use config::{ConfigError, ServiceConfig, MAX_RETENTION_DAYS};
pub use crawler::{CrawlError, CrawlReport, CrawlService, SourceFailure, SourceSummary};
pub use entity_matcher::{enrich_unmatched, match_game, match_platforms, EnrichReport, GameMatcher};
pub use feed_store::{retention_cutoff, ExpireReport, FeedStore, FeedStoreError, UpsertOutcome};
pub use keyword_engine::{build_stoplist, infer_keywords, infer_keywords_with_stoplist, SnippetContext};
pub use title_suggester::{
    load_classification, suggest_game_titles, ClassificationError, WordClassification,
    SUGGESTION_WINDOW_HOURS,
};
