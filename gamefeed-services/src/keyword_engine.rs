//! Keyword inference over unmatched headlines
//!
//! Headlines that no catalog game matched are mined for recurring words.
//! Each frequent word is then grown into multi-word phrases by looking at
//! the words around it, in five passes:
//!
//! 1. one word before the keyword
//! 2. one more word before each phrase from pass 1
//! 3. one word after the keyword
//! 4. one more word after each phrase from pass 3
//! 5. one word after each phrase from pass 1
//!
//! Phrases seen only once, or that sit at the start or end of a headline
//! when extended in that direction, are dropped. What survives is a list of
//! likely game titles for a human reviewer. Everything here is a pure
//! function of the headline snapshot and the stoplist.

use std::collections::{BTreeMap, HashMap, HashSet};

use gamefeed_core::text::tokenize;
use gamefeed_core::{Catalog, KeywordCandidate, KeywordReport};
use tracing::{debug, instrument};

/// English and Dutch function words
const FUNCTION_WORDS: &[&str] = &[
    // English
    "a", "an", "the", "of", "to", "for", "in", "on", "at", "by", "with", "from", "and", "or",
    "is", "are", "be", "it", "its", "this", "that", "you", "your", "we", "our", "how", "what",
    "why", "now", "out", "up", "vs", "not", "will", "has", "have", "more", "all", "about",
    // Dutch
    "de", "het", "een", "van", "naar", "voor", "achter", "op", "onder", "uit", "met", "zonder",
    "nu", "later", "en", "er", "die", "dat", "te", "bij", "aan", "om", "ook", "wel", "niet",
    "meer", "over", "al", "zijn", "is", "wordt", "komt", "krijgt", "deze", "je", "hoe", "wat",
    "nog", "maar", "dan", "als", "tot", "ons", "heeft", "kan", "moet", "gaat",
];

const MONTH_NAMES: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "januari", "februari", "maart", "mei", "juni", "juli",
    "augustus", "oktober",
];

/// Words common in game news that never identify a game
const NOISE_WORDS: &[&str] = &[
    "-", "trailer", "new", "year", "month", "week", "nieuwe", "nieuw", "jaar", "maand",
    "review", "gameplay", "update", "release", "releasedatum",
];

/// Occurrence count of a phrase, or a marker that it sits at a headline edge
///
/// An edge phrase cannot be extended in the direction being searched, which
/// makes it useless as a candidate for that pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetContext {
    AtEdge,
    Counted(usize),
}

impl SnippetContext {
    pub fn count(&self) -> Option<usize> {
        match self {
            SnippetContext::AtEdge => None,
            SnippetContext::Counted(count) => Some(*count),
        }
    }
}

/// Words that never count as keywords, derived from the catalog snapshot
///
/// Known titles are stoplisted both as whole phrases and word by word, so a
/// game already in the catalog does not resurface as a suggestion.
pub fn build_stoplist(catalog: &Catalog) -> HashSet<String> {
    let mut stoplist: HashSet<String> = FUNCTION_WORDS
        .iter()
        .chain(MONTH_NAMES)
        .chain(NOISE_WORDS)
        .map(|word| word.to_string())
        .collect();

    let titles = catalog
        .games
        .iter()
        .map(|game| game.title.as_str())
        .chain(catalog.publishers.iter().map(|publisher| publisher.title.as_str()))
        .chain(catalog.platforms.iter().map(|platform| platform.title.as_str()));

    for title in titles {
        let lowered = title.trim().to_lowercase();
        if lowered.is_empty() {
            continue;
        }

        stoplist.extend(lowered.split_whitespace().map(str::to_string));
        stoplist.extend(tokenize(&lowered));
        stoplist.insert(lowered);
    }

    stoplist
}

/// Words seen more than once and not stoplisted, most frequent first
pub fn count_keywords(headlines: &[Vec<String>], stoplist: &HashSet<String>) -> Vec<KeywordCandidate> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in headlines.iter().flatten() {
        *counts.entry(word.as_str()).or_default() += 1;
    }

    let mut keywords: Vec<KeywordCandidate> = counts
        .into_iter()
        .filter(|(word, count)| *count > 1 && !stoplist.contains(*word))
        .map(|(word, count)| KeywordCandidate::new(word, count))
        .collect();
    sort_candidates(&mut keywords);

    keywords
}

/// Positions where `snippet` occurs as a run of whole words
fn occurrences<'a>(snippet: &'a [&'a str], words: &'a [String]) -> impl Iterator<Item = usize> + 'a {
    let len = snippet.len();
    (0..words.len().saturating_sub(len.saturating_sub(1)))
        .filter(move |&start| {
            len > 0
                && start + len <= words.len()
                && words[start..start + len]
                    .iter()
                    .zip(snippet)
                    .all(|(word, part)| word == part)
        })
}

fn record(contexts: &mut BTreeMap<String, SnippetContext>, key: String, context: SnippetContext) {
    match context {
        SnippetContext::AtEdge => {
            contexts.insert(key, SnippetContext::AtEdge);
        }
        SnippetContext::Counted(_) => {
            let entry = contexts.entry(key).or_insert(SnippetContext::Counted(0));
            if let SnippetContext::Counted(count) = entry {
                *count += 1;
            }
        }
    }
}

/// Extend `snippet` by the word before each of its occurrences
///
/// An occurrence at the start of a headline marks `snippet` itself as
/// `AtEdge`.
pub fn previous_word(snippet: &str, headlines: &[Vec<String>]) -> BTreeMap<String, SnippetContext> {
    let parts: Vec<&str> = snippet.split_whitespace().collect();
    let mut contexts = BTreeMap::new();
    if parts.is_empty() {
        return contexts;
    }

    for words in headlines {
        for start in occurrences(&parts, words) {
            if start == 0 {
                record(&mut contexts, parts.join(" "), SnippetContext::AtEdge);
            } else {
                let key = format!("{} {}", words[start - 1], parts.join(" "));
                record(&mut contexts, key, SnippetContext::Counted(1));
            }
        }
    }

    contexts
}

/// Extend `snippet` by the word after each of its occurrences
///
/// An occurrence at the end of a headline marks `snippet` itself as
/// `AtEdge`.
pub fn next_word(snippet: &str, headlines: &[Vec<String>]) -> BTreeMap<String, SnippetContext> {
    let parts: Vec<&str> = snippet.split_whitespace().collect();
    let mut contexts = BTreeMap::new();
    if parts.is_empty() {
        return contexts;
    }

    for words in headlines {
        for start in occurrences(&parts, words) {
            let end = start + parts.len();
            if end == words.len() {
                record(&mut contexts, parts.join(" "), SnippetContext::AtEdge);
            } else {
                let key = format!("{} {}", parts.join(" "), words[end]);
                record(&mut contexts, key, SnippetContext::Counted(1));
            }
        }
    }

    contexts
}

/// Keep phrases seen more than once; drops edge markers
pub fn prune(contexts: &BTreeMap<String, SnippetContext>) -> BTreeMap<String, usize> {
    contexts
        .iter()
        .filter_map(|(snippet, context)| match context.count() {
            Some(count) if count > 1 => Some((snippet.clone(), count)),
            _ => None,
        })
        .collect()
}

/// Union of the five expansion passes for one keyword, pruned
pub fn expand_keyword(keyword: &str, headlines: &[Vec<String>]) -> BTreeMap<String, usize> {
    let relevant: Vec<Vec<String>> = headlines
        .iter()
        .filter(|words| words.iter().any(|word| word == keyword))
        .cloned()
        .collect();

    let with_previous = prune(&previous_word(keyword, &relevant));
    let with_next = prune(&next_word(keyword, &relevant));

    let mut passes = vec![with_previous.clone(), with_next.clone()];
    for parent in with_previous.keys() {
        passes.push(prune(&previous_word(parent, &relevant)));
        passes.push(prune(&next_word(parent, &relevant)));
    }
    for parent in with_next.keys() {
        passes.push(prune(&next_word(parent, &relevant)));
    }

    let mut merged = BTreeMap::new();
    for pass in passes {
        merge_max(&mut merged, pass);
    }
    merged
}

fn merge_max(into: &mut BTreeMap<String, usize>, from: BTreeMap<String, usize>) {
    for (snippet, count) in from {
        let entry = into.entry(snippet).or_insert(count);
        *entry = (*entry).max(count);
    }
}

fn sort_candidates(candidates: &mut [KeywordCandidate]) {
    candidates.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then_with(|| a.snippet.cmp(&b.snippet))
    });
}

/// Run the full inference over a snapshot of unmatched headlines
pub fn infer_keywords(headlines: &[String], catalog: &Catalog) -> KeywordReport {
    infer_keywords_with_stoplist(headlines, &build_stoplist(catalog))
}

#[instrument(skip_all, fields(headlines = headlines.len()))]
pub fn infer_keywords_with_stoplist(headlines: &[String], stoplist: &HashSet<String>) -> KeywordReport {
    let tokenized: Vec<Vec<String>> = headlines.iter().map(|headline| tokenize(headline)).collect();
    let keywords = count_keywords(&tokenized, stoplist);

    let mut merged = BTreeMap::new();
    for keyword in &keywords {
        merge_max(&mut merged, expand_keyword(&keyword.snippet, &tokenized));
    }

    let mut candidates: Vec<KeywordCandidate> = merged
        .into_iter()
        .map(|(snippet, count)| KeywordCandidate::new(snippet, count))
        .collect();
    sort_candidates(&mut candidates);

    debug!(
        "Inferred {} keywords and {} candidates",
        keywords.len(),
        candidates.len()
    );
    KeywordReport {
        keywords,
        candidates,
        headline_count: headlines.len(),
    }
}
