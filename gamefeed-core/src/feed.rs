//! Feed sources and crawled news items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{CoreError, CoreResult};

/// Separator used when categories are flattened into a single column
pub const CATEGORY_SEPARATOR: &str = ", ";

/// Which RSS element carries the permanent article URL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkField {
    /// `<link>`
    #[default]
    Link,
    /// `<guid>`
    Guid,
}

impl LinkField {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkField::Link => "link",
            LinkField::Guid => "guid",
        }
    }
}

impl fmt::Display for LinkField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LinkField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "link" => Ok(LinkField::Link),
            "guid" => Ok(LinkField::Guid),
            other => Err(CoreError::parse(format!("Unknown link field: {}", other))),
        }
    }
}

/// One external RSS endpoint with its own field and date quirks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    /// Site identifier stored on every item (e.g. "gamed")
    pub name: String,
    /// Feed URL
    pub url: String,
    /// Element holding the canonical article URL
    #[serde(default)]
    pub link_field: LinkField,
    /// chrono format string for `<pubDate>`
    pub date_format: String,
    /// Feed reports local time as UTC; add the fixed correction
    #[serde(default)]
    pub apply_tz_offset: bool,
    /// Titles arrive UTF-8 encoded twice
    #[serde(default)]
    pub repair_double_encoding: bool,
    /// Feed is known to list items newest first
    #[serde(default)]
    pub newest_first: bool,
}

impl FeedSource {
    pub fn new(name: &str, url: &str, link_field: LinkField, date_format: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            link_field,
            date_format: date_format.to_string(),
            apply_tz_offset: false,
            repair_double_encoding: false,
            newest_first: false,
        }
    }

    pub fn with_tz_offset(mut self) -> Self {
        self.apply_tz_offset = true;
        self
    }

    pub fn with_double_encoding_repair(mut self) -> Self {
        self.repair_double_encoding = true;
        self
    }

    pub fn with_newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    /// Reject sources that can never produce an item
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::invalid_source(&self.url, "name is empty"));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(CoreError::invalid_source(
                &self.name,
                format!("unsupported url {}", self.url),
            ));
        }
        if self.date_format.trim().is_empty() {
            return Err(CoreError::invalid_source(&self.name, "date format is empty"));
        }
        Ok(())
    }
}

/// A normalized item that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeedItem {
    pub title: String,
    pub url: String,
    pub site: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub game_id: Option<i64>,
}

impl NewFeedItem {
    pub fn categories_string(&self) -> String {
        join_categories(&self.categories)
    }
}

/// A news item in the live store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Live-store identifier
    pub id: i64,
    pub title: String,
    pub url: String,
    pub site: String,
    pub published_at: DateTime<Utc>,
    pub categories: Vec<String>,
    /// Matched game; `None` means unmatched
    pub game_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeedItem {
    pub fn is_unmatched(&self) -> bool {
        self.game_id.is_none()
    }

    pub fn categories_string(&self) -> String {
        join_categories(&self.categories)
    }

    /// Snapshot written to the monthly archive
    pub fn to_archived(&self) -> ArchivedItem {
        ArchivedItem {
            title: self.title.clone(),
            url: self.url.clone(),
            site: self.site.clone(),
            published_at: self.published_at,
            categories: self.categories.clone(),
            game_id: self.game_id,
        }
    }
}

/// Archived snapshot of a feed item, without the live-store identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedItem {
    pub title: String,
    pub url: String,
    pub site: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub game_id: Option<i64>,
}

impl ArchivedItem {
    /// Archive key (`YYYY-MM`) of the month the item was published in
    pub fn month_key(&self) -> String {
        self.published_at.format("%Y-%m").to_string()
    }
}

pub fn join_categories(categories: &[String]) -> String {
    categories.join(CATEGORY_SEPARATOR)
}

pub fn split_categories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}
