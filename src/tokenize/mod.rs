//! Tokenizers shared by the message and feature layers.
//!
//! Two tokenizers are provided:
//!
//! - [`partition`]: the canonical tokenizer for feature extraction. It keeps
//!   every character of the input: maximal runs of word-ish characters
//!   (`0-9A-Za-z@#'_-`, so handles like `@Twitter` and hashtags stay whole)
//!   become single tokens, and every remaining character is emitted as its
//!   own one-character token, spaces included.
//! - [`whitespace`]: plain whitespace splitting, a word-level
//!   alternative for when punctuation and spacing are noise.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// A run of token characters, or any single non-token character.
static PARTITION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9A-Za-z@#'_-]+|[^0-9A-Za-z@#'_-]").unwrap());

/// Splits text into partition tokens.
///
/// The concatenation of the returned tokens always equals the input, so
/// character-level statistics can be recovered from the token stream.
pub fn partition(text: &str) -> Vec<String> {
    PARTITION_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Splits text on whitespace, discarding the whitespace itself.
pub fn whitespace(text: &str) -> Vec<String> {
    text.split_whitespace().map(|t| t.to_string()).collect()
}

/// Counts token occurrences into an ordered frequency map.
pub fn token_distribution<I, S>(tokens: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut dist = BTreeMap::new();
    for token in tokens {
        *dist.entry(token.into()).or_insert(0) += 1;
    }
    dist
}
