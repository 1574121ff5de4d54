//! Headline normalization shared by matching and keyword inference

/// Escaped ampersand forms that survive feed decoding
const NOISE_ENTITIES: &[&str] = &["&amp;", "&#038;", "&#38;", "&quot;", "&#039;", "&#39;"];

/// Characters replaced by a space before comparing headlines
const NOISE_CHARS: &[char] = &[
    '&', '[', ']', '(', ')', '{', '}', ':', ';', '-', '!', '?', ',', '"', '|',
];

/// Lower-case a headline and strip punctuation noise, collapsing spaces
pub fn clean_headline(text: &str) -> String {
    let mut cleaned = text.to_lowercase();
    for entity in NOISE_ENTITIES {
        cleaned = cleaned.replace(entity, " ");
    }

    cleaned
        .chars()
        .map(|c| if NOISE_CHARS.contains(&c) { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Words of a cleaned headline
pub fn tokenize(text: &str) -> Vec<String> {
    clean_headline(text)
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}
