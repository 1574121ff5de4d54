//! Transient results of the keyword inference passes

use serde::{Deserialize, Serialize};

/// A one-or-more-word phrase proposed as a possible game title
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeywordCandidate {
    pub snippet: String,
    pub occurrences: usize,
}

impl KeywordCandidate {
    pub fn new(snippet: impl Into<String>, occurrences: usize) -> Self {
        Self {
            snippet: snippet.into(),
            occurrences,
        }
    }

    pub fn word_count(&self) -> usize {
        self.snippet.split_whitespace().count()
    }
}

/// Combined result set handed to the human reviewer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordReport {
    /// Single-word frequency table, most frequent first
    pub keywords: Vec<KeywordCandidate>,
    /// Multi-word candidates from context expansion, most frequent first
    pub candidates: Vec<KeywordCandidate>,
    /// Number of unmatched headlines the report was built from
    pub headline_count: usize,
}

/// How a word is classified in the curated `keywords.json` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordClass {
    /// Known to appear in game titles
    Title,
    /// Known noise; stripped from suggestions
    Noise,
}

/// Suggested game title for one recent unmatched item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleSuggestion {
    pub item_id: i64,
    pub headline: String,
    pub suggestion: String,
}
