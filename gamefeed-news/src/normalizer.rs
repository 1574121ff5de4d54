//! Turns a raw RSS document into normalized feed items
//!
//! Every site has its own quirks: the canonical URL lives in `<link>` or
//! `<guid>`, dates come in site-specific formats, some sites stamp local time
//! as UTC and a couple of them double-encode their titles.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use gamefeed_core::{FeedSource, LinkField, NewFeedItem};
use quick_xml::escape::unescape_with;
use tracing::debug;

use crate::error::{ItemError, NewsError};

/// Hours added for sources flagged with `apply_tz_offset`
pub const TZ_CORRECTION_HOURS: i64 = 2;

/// A corrupted "é" some feeds emit
const MOJIBAKE_E_ACUTE: &str = "ï¿½";

/// Parse a raw document into a single-pass sequence of items
///
/// Fails only when the document itself is unreadable. Problems with a single
/// item are yielded as `ItemError`s so the caller can skip that item.
pub fn normalize<'a>(raw: &[u8], source: &'a FeedSource) -> Result<NormalizedItems<'a>, NewsError> {
    let channel = rss::Channel::read_from(raw)
        .map_err(|e| NewsError::ParseError(format!("{}: {}", source.name, e)))?;

    Ok(NormalizedItems {
        source,
        items: channel.into_items().into_iter(),
    })
}

/// Lazily normalized items of one fetched document
pub struct NormalizedItems<'a> {
    source: &'a FeedSource,
    items: std::vec::IntoIter<rss::Item>,
}

impl NormalizedItems<'_> {
    /// Items not yet consumed
    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

impl Iterator for NormalizedItems<'_> {
    type Item = Result<NewFeedItem, ItemError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.items
            .next()
            .map(|item| normalize_item(&item, self.source))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

/// Normalize one RSS item according to its source's quirks
pub fn normalize_item(item: &rss::Item, source: &FeedSource) -> Result<NewFeedItem, ItemError> {
    let title = item
        .title()
        .map(|raw| decode_title(raw, source.repair_double_encoding))
        .filter(|title| !title.is_empty())
        .ok_or(ItemError::MissingTitle)?;

    let url = match source.link_field {
        LinkField::Link => item.link(),
        LinkField::Guid => item.guid().map(|guid| guid.value()),
    }
    .map(str::trim)
    .filter(|url| !url.is_empty())
    .ok_or_else(|| ItemError::MissingLink {
        title: title.clone(),
        field: source.link_field,
    })?
    .to_string();

    let raw_date = item.pub_date().ok_or_else(|| ItemError::MissingDate {
        title: title.clone(),
    })?;
    let published_at = parse_published_at(raw_date, source).ok_or_else(|| ItemError::InvalidDate {
        title: title.clone(),
        value: raw_date.to_string(),
        format: source.date_format.clone(),
    })?;

    let categories = item
        .categories()
        .iter()
        .map(|category| category.name().trim().to_string())
        .filter(|category| !category.is_empty())
        .collect();

    Ok(NewFeedItem {
        title,
        url,
        site: source.name.clone(),
        published_at,
        categories,
        game_id: None,
    })
}

/// Parse a `pubDate` with the source's format, applying the local-time fix
///
/// Formats without an offset are read as UTC. When the source format does
/// not match, RFC 2822 is tried before giving up.
pub fn parse_published_at(raw: &str, source: &FeedSource) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let format = source.date_format.as_str();

    let parsed = DateTime::parse_from_str(raw, format)
        .map(|date| date.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, format).map(|naive| naive.and_utc()))
        .or_else(|_| {
            debug!(
                "Date \"{}\" does not match {} for {}, trying RFC 2822",
                raw, format, source.name
            );
            DateTime::parse_from_rfc2822(raw).map(|date| date.with_timezone(&Utc))
        })
        .ok()?;

    if source.apply_tz_offset {
        Some(parsed + Duration::hours(TZ_CORRECTION_HOURS))
    } else {
        Some(parsed)
    }
}

/// Repair encoding damage and decode HTML entities in a title
pub fn decode_title(raw: &str, repair_double_encoding: bool) -> String {
    let repaired = raw.replace(MOJIBAKE_E_ACUTE, "é");
    let repaired = if repair_double_encoding {
        undo_double_encoding(&repaired)
    } else {
        repaired
    };

    decode_html_entities(&repaired).trim().to_string()
}

/// Reinterpret a string whose UTF-8 bytes were decoded as Latin-1
fn undo_double_encoding(text: &str) -> String {
    if !text.chars().all(|c| u32::from(c) <= 0xFF) {
        return text.to_string();
    }

    let bytes: Vec<u8> = text.chars().map(|c| u32::from(c) as u8).collect();
    String::from_utf8(bytes).unwrap_or_else(|_| text.to_string())
}

/// Decode each `&name;` or `&#N;` reference on its own
///
/// A reference that does not resolve, or a bare `&`, is kept verbatim and
/// does not stop the rest of the title from being decoded.
fn decode_html_entities(text: &str) -> String {
    let mut decoded = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        decoded.push_str(&rest[..start]);
        rest = &rest[start..];

        let reference = rest[1..]
            .find(|c: char| c == ';' || c == '&' || c.is_whitespace())
            .map(|end| &rest[..end + 2])
            .filter(|candidate| candidate.ends_with(';'));

        match reference.map(|r| (r, unescape_with(r, resolve_html_entity))) {
            Some((reference, Ok(value))) => {
                decoded.push_str(&value);
                rest = &rest[reference.len()..];
            }
            _ => {
                decoded.push('&');
                rest = &rest[1..];
            }
        }
    }

    decoded.push_str(rest);
    decoded
}

fn resolve_html_entity(entity: &str) -> Option<&'static str> {
    let resolved = match entity {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "eacute" => "é",
        "egrave" => "è",
        "euml" => "ë",
        "iuml" => "ï",
        "ouml" => "ö",
        "uuml" => "ü",
        "aacute" => "á",
        "hellip" => "…",
        "ndash" => "–",
        "mdash" => "—",
        "lsquo" | "rsquo" => "'",
        "ldquo" | "rdquo" => "\"",
        "trade" => "™",
        "reg" => "®",
        "copy" => "©",
        _ => return None,
    };
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{ISO_SPACED_OFFSET_FORMAT, ISO_ZULU_FORMAT, RFC822_FORMAT};
    use chrono::TimeZone;

    fn rss_document(items: &str) -> Vec<u8> {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <rss version="2.0"><channel>
                <title>Test feed</title>
                <link>https://example.com</link>
                <description>Test</description>
                {}
            </channel></rss>"#,
            items
        )
        .into_bytes()
    }

    fn source(format: &str) -> FeedSource {
        FeedSource::new("gamed", "https://example.com/rss", LinkField::Link, format)
    }

    #[test]
    fn test_normalizes_rss_items() {
        let raw = rss_document(
            r#"<item>
                <title>Super Mario Odyssey &amp;amp; more</title>
                <link>https://example.com/mario</link>
                <guid>https://example.com/?p=1</guid>
                <pubDate>Tue, 09 Oct 2018 14:03:00 +0200</pubDate>
                <category>Nintendo Switch</category>
                <category>Nieuws</category>
            </item>"#,
        );
        let source = source(RFC822_FORMAT);

        let items: Vec<_> = normalize(&raw, &source).unwrap().collect();
        assert_eq!(items.len(), 1);

        let item = items[0].as_ref().unwrap();
        assert_eq!(item.title, "Super Mario Odyssey & more");
        assert_eq!(item.url, "https://example.com/mario");
        assert_eq!(item.site, "gamed");
        assert_eq!(
            item.published_at,
            Utc.with_ymd_and_hms(2018, 10, 9, 12, 3, 0).unwrap()
        );
        assert_eq!(item.categories_string(), "Nintendo Switch, Nieuws");
        assert_eq!(item.game_id, None);
    }

    #[test]
    fn test_guid_link_field() {
        let raw = rss_document(
            r#"<item>
                <title>Headline</title>
                <link>http://feedproxy.google.com/~r/redirect</link>
                <guid isPermaLink="true">https://example.com/article</guid>
                <pubDate>Tue, 09 Oct 2018 14:03:00 +0000</pubDate>
            </item>"#,
        );
        let mut source = source(RFC822_FORMAT);
        source.link_field = LinkField::Guid;

        let item = normalize(&raw, &source).unwrap().next().unwrap().unwrap();
        assert_eq!(item.url, "https://example.com/article");
    }

    #[test]
    fn test_tz_offset_adds_two_hours() {
        let plain = source(RFC822_FORMAT);
        let corrected = source(RFC822_FORMAT).with_tz_offset();
        let raw = "Tue, 09 Oct 2018 14:03:00 +0000";

        let base = parse_published_at(raw, &plain).unwrap();
        let shifted = parse_published_at(raw, &corrected).unwrap();

        assert_eq!(shifted - base, Duration::hours(TZ_CORRECTION_HOURS));
    }

    #[test]
    fn test_source_specific_formats() {
        let zulu = parse_published_at("2018-10-09T14:03:00Z", &source(ISO_ZULU_FORMAT)).unwrap();
        assert_eq!(zulu, Utc.with_ymd_and_hms(2018, 10, 9, 14, 3, 0).unwrap());

        let spaced =
            parse_published_at("2018-10-09T14:03:00 +0200", &source(ISO_SPACED_OFFSET_FORMAT))
                .unwrap();
        assert_eq!(spaced, Utc.with_ymd_and_hms(2018, 10, 9, 12, 3, 0).unwrap());
    }

    #[test]
    fn test_unparseable_date_skips_only_that_item() {
        let raw = rss_document(
            r#"<item>
                <title>Broken date</title>
                <link>https://example.com/broken</link>
                <pubDate>gisteren</pubDate>
            </item>
            <item>
                <title>Good date</title>
                <link>https://example.com/good</link>
                <pubDate>Tue, 09 Oct 2018 14:03:00 +0000</pubDate>
            </item>"#,
        );
        let source = source(RFC822_FORMAT);

        let items: Vec<_> = normalize(&raw, &source).unwrap().collect();
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Err(ItemError::InvalidDate { .. })));
        assert_eq!(items[1].as_ref().unwrap().title, "Good date");
    }

    #[test]
    fn test_missing_fields() {
        let raw = rss_document(
            r#"<item><link>https://example.com/a</link></item>
            <item><title>No link</title><pubDate>Tue, 09 Oct 2018 14:03:00 +0000</pubDate></item>
            <item><title>No date</title><link>https://example.com/c</link></item>"#,
        );
        let source = source(RFC822_FORMAT);

        let items: Vec<_> = normalize(&raw, &source).unwrap().collect();
        assert_eq!(items[0], Err(ItemError::MissingTitle));
        assert!(matches!(items[1], Err(ItemError::MissingLink { .. })));
        assert!(matches!(items[2], Err(ItemError::MissingDate { .. })));
    }

    #[test]
    fn test_unreadable_document() {
        let source = source(RFC822_FORMAT);
        assert!(matches!(
            normalize(b"<html><body>503</body></html>", &source),
            Err(NewsError::ParseError(_))
        ));
    }

    #[test]
    fn test_decode_title() {
        assert_eq!(decode_title("Pok\u{ef}\u{bf}\u{bd}mon", false), "Pokémon");
        assert_eq!(decode_title("Pok\u{c3}\u{a9}mon", true), "Pokémon");
        assert_eq!(decode_title("Pok\u{c3}\u{a9}mon", false), "Pok\u{c3}\u{a9}mon");
        assert_eq!(decode_title(" Caf&eacute; &#233; ", false), "Café é");
        assert_eq!(decode_title("Ratchet & Clank", false), "Ratchet & Clank");
    }

    #[test]
    fn test_decode_title_with_bare_ampersand_and_entities() {
        assert_eq!(
            decode_title("Ratchet & Clank: Rift Apart&#8217;s trailer &eacute;", false),
            "Ratchet & Clank: Rift Apart\u{2019}s trailer é"
        );
        assert_eq!(decode_title("R&D &bogus; &amp; Q&A", false), "R&D &bogus; & Q&A");
        assert_eq!(decode_title("Tom & Jerry &", false), "Tom & Jerry &");
        assert_eq!(decode_title("&&#233;t&eacute;", false), "&été");
    }
}
