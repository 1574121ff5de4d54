//! Registry of crawled gaming news sites

use std::path::Path;

use gamefeed_core::{FeedSource, LinkField};
use tracing::info;

use crate::error::NewsError;

/// `D, d M Y H:i:s O` style dates, e.g. `Tue, 09 Oct 2018 14:03:00 +0200`
pub const RFC822_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// ISO timestamps with a literal `Z` suffix, read as UTC
pub const ISO_ZULU_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// ISO timestamps followed by a space and a numeric offset
pub const ISO_SPACED_OFFSET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S %z";

/// Built-in list of Dutch and Belgian gaming news feeds
pub fn default_sources() -> Vec<FeedSource> {
    vec![
        FeedSource::new("4gamers", "http://www.4gamers.be/rss", LinkField::Link, RFC822_FORMAT),
        // Publishes local time stamped as UTC
        FeedSource::new(
            "dailynintendo",
            "https://www.dailynintendo.nl/feed/",
            LinkField::Link,
            RFC822_FORMAT,
        )
        .with_tz_offset(),
        FeedSource::new(
            "evilgamerz",
            "http://www.evilgamerz.com/nieuws/evilgamerz.xml",
            LinkField::Link,
            RFC822_FORMAT,
        ),
        FeedSource::new("gamed", "http://www.gamed.nl/rss", LinkField::Link, RFC822_FORMAT),
        FeedSource::new(
            "gameliner",
            "http://feeds.feedburner.com/gameliner/SuOy",
            LinkField::Link,
            RFC822_FORMAT,
        )
        .with_double_encoding_repair(),
        FeedSource::new(
            "gamequarter",
            "http://www.gamequarter.be/rss/nieuws.xml",
            LinkField::Link,
            RFC822_FORMAT,
        )
        .with_double_encoding_repair(),
        FeedSource::new(
            "gamereactor",
            "https://www.gamereactor.nl/rss/rss.php?texttype=4",
            LinkField::Link,
            RFC822_FORMAT,
        ),
        // Feedproxy links are redirects; the guid is the article URL
        FeedSource::new(
            "gamesnetnl",
            "http://feedproxy.google.com/gamersnet/KbfX",
            LinkField::Guid,
            RFC822_FORMAT,
        ),
        FeedSource::new(
            "gamingnation",
            "http://www.gamingnation.nl/feed/",
            LinkField::Guid,
            RFC822_FORMAT,
        )
        .with_tz_offset(),
        FeedSource::new(
            "igamernl",
            "http://feeds.feedburner.com/insidegamer/content?format=xml",
            LinkField::Link,
            ISO_ZULU_FORMAT,
        ),
        FeedSource::new("ignnl", "http://nl.ign.com/feed.xml", LinkField::Link, RFC822_FORMAT),
        FeedSource::new(
            "powerunlimited",
            "https://www.pu.nl/feeds/all/",
            LinkField::Link,
            RFC822_FORMAT,
        ),
        FeedSource::new(
            "telegraaf",
            "https://www.telegraaf.nl/tech/games/rss",
            LinkField::Link,
            RFC822_FORMAT,
        ),
        FeedSource::new(
            "thatsgaming",
            "http://thatsgaming.nl/feed/",
            LinkField::Link,
            RFC822_FORMAT,
        ),
        FeedSource::new(
            "xboxworldnl",
            "http://www.xboxworld.nl/artikelen/rss/",
            LinkField::Link,
            RFC822_FORMAT,
        ),
        FeedSource::new("xgn", "https://www.xgn.nl/rss", LinkField::Link, ISO_SPACED_OFFSET_FORMAT),
        FeedSource::new(
            "gameparty",
            "http://www.gameparty.net/feed/",
            LinkField::Link,
            RFC822_FORMAT,
        ),
    ]
}

/// Load a JSON array of sources, validating every entry
pub fn load_sources(path: impl AsRef<Path>) -> Result<Vec<FeedSource>, NewsError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        NewsError::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let sources: Vec<FeedSource> = serde_json::from_str(&raw).map_err(|e| {
        NewsError::InvalidConfig(format!("Invalid feed sources in {}: {}", path.display(), e))
    })?;

    for source in &sources {
        source
            .validate()
            .map_err(|e| NewsError::InvalidConfig(e.to_string()))?;
    }

    info!("Loaded {} feed sources from {}", sources.len(), path.display());
    Ok(sources)
}
