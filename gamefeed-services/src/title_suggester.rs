//! Title suggestions for recent unmatched headlines
//!
//! Words of the headline that the curated `keywords.json` table marks as
//! noise are stripped; whatever remains is offered as the probable title.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use gamefeed_core::text::tokenize;
use gamefeed_core::{FeedItem, TitleSuggestion, WordClass};
use tracing::{debug, info};

/// Only items published this recently get a suggestion
pub const SUGGESTION_WINDOW_HOURS: i64 = 48;

/// Lower-cased word to its curated class
pub type WordClassification = HashMap<String, WordClass>;

#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid classification table {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read a `{"word": "title" | "noise"}` table; a missing file is an empty table
pub fn load_classification(path: impl AsRef<Path>) -> Result<WordClassification, ClassificationError> {
    let path = path.as_ref();
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No word classification at {}", path.display());
            return Ok(WordClassification::new());
        }
        Err(source) => {
            return Err(ClassificationError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let table: HashMap<String, WordClass> =
        serde_json::from_str(&raw).map_err(|source| ClassificationError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let classification: WordClassification = table
        .into_iter()
        .map(|(word, class)| (word.trim().to_lowercase(), class))
        .filter(|(word, _)| !word.is_empty())
        .collect();

    info!(
        "Loaded {} classified words from {}",
        classification.len(),
        path.display()
    );
    Ok(classification)
}

/// Headline words minus the ones classified as noise
pub fn suggest_for_headline(headline: &str, classification: &WordClassification) -> String {
    tokenize(headline)
        .into_iter()
        .filter(|word| classification.get(word) != Some(&WordClass::Noise))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Suggest a title for every unmatched item of the last 48 hours
///
/// Items whose every word is noise get no suggestion.
pub fn suggest_game_titles(
    items: &[FeedItem],
    classification: &WordClassification,
    now: DateTime<Utc>,
) -> Vec<TitleSuggestion> {
    let since = now - Duration::hours(SUGGESTION_WINDOW_HOURS);

    items
        .iter()
        .filter(|item| item.is_unmatched() && item.published_at >= since)
        .filter_map(|item| {
            let suggestion = suggest_for_headline(&item.title, classification);
            (!suggestion.is_empty()).then(|| TitleSuggestion {
                item_id: item.id,
                headline: item.title.clone(),
                suggestion,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn item(id: i64, title: &str, published_at: DateTime<Utc>, game_id: Option<i64>) -> FeedItem {
        FeedItem {
            id,
            title: title.to_string(),
            url: format!("https://example.com/{}", id),
            site: "gamed".to_string(),
            published_at,
            categories: vec![],
            game_id,
            created_at: published_at,
            updated_at: published_at,
        }
    }

    fn classification() -> WordClassification {
        [
            ("review", WordClass::Noise),
            ("getest", WordClass::Noise),
            ("nieuwe", WordClass::Noise),
            ("beelden", WordClass::Noise),
            ("octopath", WordClass::Title),
        ]
        .into_iter()
        .map(|(word, class)| (word.to_string(), class))
        .collect()
    }

    #[test]
    fn test_strips_noise_words() {
        assert_eq!(
            suggest_for_headline("Review: Octopath Traveler getest!", &classification()),
            "octopath traveler"
        );
    }

    #[test]
    fn test_window_and_matching_filters() {
        let now = Utc::now();
        let items = vec![
            item(1, "Nieuwe beelden Octopath Traveler", now - Duration::hours(3), None),
            item(2, "Octopath Traveler review", now - Duration::hours(49), None),
            item(3, "Octopath Traveler getest", now - Duration::hours(1), Some(5)),
            item(4, "Nieuwe beelden", now, None),
        ];

        let suggestions = suggest_game_titles(&items, &classification(), now);
        assert_eq!(
            suggestions,
            vec![TitleSuggestion {
                item_id: 1,
                headline: "Nieuwe beelden Octopath Traveler".to_string(),
                suggestion: "octopath traveler".to_string(),
            }]
        );
    }

    #[test]
    fn test_load_classification() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"Review": "noise", "mario": "title"}}"#).unwrap();

        let table = load_classification(file.path()).unwrap();
        assert_eq!(table.get("review"), Some(&WordClass::Noise));
        assert_eq!(table.get("mario"), Some(&WordClass::Title));
    }

    #[test]
    fn test_missing_classification_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let table = load_classification(dir.path().join("keywords.json")).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_invalid_classification() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"review": "maybe"}}"#).unwrap();

        assert!(matches!(
            load_classification(file.path()),
            Err(ClassificationError::Parse { .. })
        ));
    }
}
