//! Core types for the game news feed pipeline
//!
//! This crate defines the shared data structures used across the workspace:
//! feed sources, crawled feed items, the read-only game catalog and the
//! transient keyword inference results.

pub mod catalog;
pub mod error;
pub mod feed;
pub mod keyword;
pub mod text;

pub use catalog::{Catalog, GameEntry, PlatformEntry, PublisherEntry};
pub use error::{CoreError, CoreResult};
pub use feed::{ArchivedItem, FeedItem, FeedSource, LinkField, NewFeedItem};
pub use keyword::{KeywordCandidate, KeywordReport, TitleSuggestion, WordClass};
