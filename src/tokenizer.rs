//! Text tokenizer with stopword filtering and Porter stemming.
//!
//! Turns prose into lowercased word tokens: punctuation is stripped, words
//! made purely of digits are dropped, and an optional stemming pass maps each
//! token to its Porter stem. Stopword filtering is a separate step because
//! some heuristics (article-type detection) need the stopwords in place.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "www", "http", "com", "the", "be", "to", "of", "and", "a", "in", "that", "have", "i",
        "it", "for", "not", "on", "with", "he", "as", "you", "do", "at", "this", "but", "his",
        "by", "from", "they", "we", "say", "her", "she", "or", "an", "will", "my", "one", "all",
        "would", "there", "their", "what", "so", "up", "out", "if", "about", "who", "get", "go",
        "which", "me", "when", "make", "can", "like", "time", "no", "just", "him", "know",
        "take", "into", "year", "your", "good", "some", "could", "them", "see", "other", "than",
        "then", "now", "only", "come", "its", "over", "also", "back", "after", "use", "two",
        "how", "our", "work", "first", "well", "way", "even", "new", "want", "any", "these",
        "day", "most", "us", "because", "is", "was", "are", "has", "were", "more", "been",
        "very", "where", "did", "should", "may", "non",
    ]
    .into_iter()
    .collect()
});

static STEMMER: LazyLock<Stemmer> = LazyLock::new(|| Stemmer::create(Algorithm::English));

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w ]").unwrap());
static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

/// Tokens shorter than this never survive stopword filtering.
const MIN_WORD_LENGTH: usize = 3;

/// Tokenizes `text` into lowercased words, optionally stemmed.
pub fn tokenize(text: &str, stem: bool) -> Vec<String> {
    let mut prepared = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\'' | '`' | ';' | ',' | '?' | '!' => {}
            '_' | '@' | '-' | '\t' | '/' | '\\' | '.' => prepared.push(' '),
            _ => prepared.push(c),
        }
    }

    let mut tokens = Vec::new();
    for word in prepared.split_whitespace() {
        let word = NON_WORD.replace_all(word, "").to_lowercase();
        let word = word.trim();
        if word.is_empty() || DIGITS.is_match(word) {
            continue;
        }
        if stem {
            tokens.push(STEMMER.stem(word).into_owned());
        } else {
            tokens.push(word.to_owned());
        }
    }
    tokens
}

/// Removes stopwords and words shorter than three characters.
pub fn filter_stop_words(tokens: Vec<String>) -> Vec<String> {
    tokens
        .into_iter()
        .filter(|w| w.len() >= MIN_WORD_LENGTH && !STOP_WORDS.contains(w.as_str()))
        .collect()
}
