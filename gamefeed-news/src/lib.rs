//! Feed clients for the game news pipeline
//!
//! This crate provides:
//! - the registry of crawled gaming news sites and their quirks
//! - an HTTP fetcher for raw feed documents
//! - the normalizer turning a raw RSS document into `NewFeedItem`s

pub mod error;
pub mod fetcher;
pub mod normalizer;
pub mod sources;

pub use error::{ItemError, NewsError};
pub use fetcher::{FeedFetcher, FetcherConfig, BROWSER_USER_AGENT};
pub use normalizer::{normalize, NormalizedItems, TZ_CORRECTION_HOURS};
pub use sources::{default_sources, load_sources};
