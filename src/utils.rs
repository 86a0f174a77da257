// src/utils.rs

//! Text helpers shared by the vectorizer, the perturbation sampler and the aggregator.

use std::ops::Range;

/// Byte ranges of the maximal alphanumeric runs in `text`, in order.
pub fn token_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, ch) in text.char_indices() {
        match (ch.is_alphanumeric(), start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                spans.push(s..idx);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push(s..text.len());
    }
    spans
}

/// Lower-cased alphanumeric tokens of `text`.
pub fn tokenize_lowercase(text: &str) -> Vec<String> {
    token_spans(text)
        .into_iter()
        .map(|span| text[span].to_lowercase())
        .collect()
}

/// Lower-cases a feature token and strips punctuation. Whitespace and
/// underscores survive so multi-word features can still be split later.
pub fn normalize_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .trim()
        .to_string()
}
