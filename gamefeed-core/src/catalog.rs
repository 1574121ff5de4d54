//! Read-only snapshot of the site's game, publisher and platform catalogs

use serde::{Deserialize, Serialize};

/// A known game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEntry {
    pub id: i64,
    pub title: String,
    /// Comma-separated alternative titles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<String>,
}

impl GameEntry {
    pub fn new(id: i64, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            aliases: None,
        }
    }

    pub fn with_aliases(mut self, aliases: &str) -> Self {
        self.aliases = Some(aliases.to_string());
        self
    }

    /// Aliases split on commas, trimmed, empty entries dropped
    pub fn alias_list(&self) -> Vec<&str> {
        self.aliases
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|alias| !alias.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A known publisher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherEntry {
    pub id: i64,
    pub title: String,
}

/// A known platform (console, handheld, PC, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformEntry {
    pub id: i64,
    pub title: String,
}

/// Catalog snapshot taken at the start of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub games: Vec<GameEntry>,
    pub publishers: Vec<PublisherEntry>,
    pub platforms: Vec<PlatformEntry>,
}

impl Catalog {
    pub fn new(
        games: Vec<GameEntry>,
        publishers: Vec<PublisherEntry>,
        platforms: Vec<PlatformEntry>,
    ) -> Self {
        Self {
            games,
            publishers,
            platforms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty() && self.publishers.is_empty() && self.platforms.is_empty()
    }

    /// Games ordered longest title first, ties broken by id
    ///
    /// "Super Game 2" must be tried before "Super Game" so the shorter title
    /// does not swallow headlines about the sequel.
    pub fn games_longest_first(&self) -> Vec<&GameEntry> {
        let mut games: Vec<&GameEntry> = self.games.iter().collect();
        games.sort_by(|a, b| {
            b.title
                .chars()
                .count()
                .cmp(&a.title.chars().count())
                .then(a.id.cmp(&b.id))
        });
        games
    }
}
