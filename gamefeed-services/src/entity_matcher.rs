//! Maps headlines to catalog games and category text to platforms

use std::collections::BTreeSet;

use gamefeed_core::text::clean_headline;
use gamefeed_core::{Catalog, PlatformEntry};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::feed_store::{FeedStore, FeedStoreError};

/// Catalog titles prepared for repeated headline lookups
#[derive(Debug, Clone)]
pub struct GameMatcher {
    /// (game id, cleaned title and aliases), longest title first
    entries: Vec<(i64, Vec<String>)>,
}

impl GameMatcher {
    pub fn new(catalog: &Catalog) -> Self {
        let entries = catalog
            .games_longest_first()
            .into_iter()
            .filter_map(|game| {
                let needles: Vec<String> = std::iter::once(game.title.as_str())
                    .chain(game.alias_list())
                    .map(clean_headline)
                    .filter(|needle| !needle.is_empty())
                    .collect();

                (!needles.is_empty()).then_some((game.id, needles))
            })
            .collect();

        Self { entries }
    }

    /// First game whose title or alias occurs in the cleaned headline
    pub fn find(&self, headline: &str) -> Option<i64> {
        let cleaned = clean_headline(headline);
        if cleaned.is_empty() {
            return None;
        }

        self.entries
            .iter()
            .find(|(_, needles)| needles.iter().any(|needle| cleaned.contains(needle.as_str())))
            .map(|(id, _)| *id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One-off lookup of a headline against the catalog
pub fn match_game(title: &str, catalog: &Catalog) -> Option<i64> {
    GameMatcher::new(catalog).find(title)
}

/// Platforms whose title occurs in the item's category text
pub fn match_platforms(categories: &str, platforms: &[PlatformEntry]) -> BTreeSet<i64> {
    let haystack = categories.to_lowercase();

    platforms
        .iter()
        .filter(|platform| {
            let title = platform.title.trim().to_lowercase();
            !title.is_empty() && haystack.contains(&title)
        })
        .map(|platform| platform.id)
        .collect()
}

/// Outcome of re-matching the stored unmatched items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichReport {
    /// Unmatched items examined
    pub examined: usize,
    /// Items that got a game
    pub matched: usize,
    /// New game/platform links recorded
    pub platform_links: usize,
}

/// Re-run game matching for every stored item still lacking a game
#[instrument(skip_all)]
pub fn enrich_unmatched(store: &FeedStore, catalog: &Catalog) -> Result<EnrichReport, FeedStoreError> {
    let matcher = GameMatcher::new(catalog);
    let unmatched = store.unmatched()?;
    let mut report = EnrichReport {
        examined: unmatched.len(),
        ..Default::default()
    };

    if matcher.is_empty() {
        return Ok(report);
    }

    for item in unmatched {
        let Some(game_id) = matcher.find(&item.title) else {
            continue;
        };

        if store.set_game(item.id, game_id)? {
            report.matched += 1;
            debug!("Matched \"{}\" to game {}", item.title, game_id);
        }

        for platform_id in match_platforms(&item.categories_string(), &catalog.platforms) {
            if store.link_game_platform(game_id, platform_id)? {
                report.platform_links += 1;
            }
        }
    }

    info!(
        "Matched {} of {} unmatched news items",
        report.matched, report.examined
    );
    Ok(report)
}
