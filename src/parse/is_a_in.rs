//! "Is-a-in" phrase evidence: locations in an opening "X is a ... in ..."
//! sentence.
//!
//! Only articles that themselves have coordinates are scanned. A bounded
//! segment after the bolded title is tokenized; a copular verb must appear
//! within a few words and before the first period, a preposition opens the
//! scan region, and the link entities up to the sentence's end that resolve
//! (directly or via redirect) to coordinated articles are emitted.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::Limits;
use crate::coordinates::Coordinates;
use crate::parse::{suffix_chars, wiki_title};

const RELEVANT_VERBS: [&str; 4] = ["is", "was", "are", "were"];
const RELEVANT_PREPOSITIONS: [&str; 3] = ["in", "on", "at"];

/// Replacement marker for distance-conversion templates; its presence
/// disqualifies the sentence.
const DELETED_DISTANCE: &str = "---DISTANCE DELETED---";

static ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[(.*?)(\||(]]))").unwrap());
static DISTANCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2,}\s*(km|kilometer|mile|mi)").unwrap());
static CONVERT_DISTANCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[Cc]onvert.*?\d{2,}.*?((km)|(mi)).*?}}").unwrap());
static TEMPLATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\s*\{.*?}\s*}").unwrap());
static ENCODED_ANGLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(&lt;)|(&gt;)").unwrap());
static REF_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"ref name.*?=.*?/ref").unwrap());
static HTML_ESCAPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&.{1,4};").unwrap());
static LOOSE_PUNCT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+[,;|?]+\s+").unwrap());
static EMPTY_PARENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\s*\)").unwrap());

/// Extracts the "is-a-in" location set of one record. Empty when the
/// structure is absent or disqualified.
pub fn parse_is_a_in(
    title: &str,
    page: &str,
    coordinates: &HashMap<String, Coordinates>,
    redirects: &HashMap<String, String>,
    limits: &Limits,
) -> Vec<String> {
    if !coordinates.contains_key(title) {
        return Vec::new();
    }

    let anchor = Regex::new(&format!(
        r"'''\s*?{}\s*?'''",
        regex::escape(&title.replace('_', " "))
    ));
    let Ok(anchor) = anchor else {
        return Vec::new();
    };
    let Some(m) = anchor.find(page) else {
        return Vec::new();
    };

    let text = relevant_text_portion(page, m.end(), limits);
    // Distances right after the title ("100 km east of ...") make the
    // sentence a low-confidence surrogate.
    if DISTANCE.is_match(&text) || text.contains(DELETED_DISTANCE) {
        return Vec::new();
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();

    let Some(verb_index) = first_verb_index(&tokens, limits.max_words_till_verb) else {
        return Vec::new();
    };
    let Some(preposition_index) = first_preposition_index(&tokens, verb_index) else {
        return Vec::new();
    };

    let mut portion: Vec<&str> = Vec::new();
    let mut found_period = false;
    for &token in &tokens[preposition_index + 1..] {
        portion.push(token);
        if ends_sentence(token) {
            found_period = true;
            break;
        }
    }
    if !found_period {
        return Vec::new();
    }

    let portion = portion.join(" ");
    let mut locations = Vec::new();
    for caps in ENTITY.captures_iter(&portion) {
        let mut target = wiki_title(caps.get(1).unwrap().as_str());
        if let Some(redirect) = redirects.get(&target) {
            target = wiki_title(redirect);
        }
        if coordinates.contains_key(&target) {
            locations.push(target);
        }
    }
    locations
}

// The bounded, markup-lightened segment right after the bolded title.
fn relevant_text_portion(page: &str, title_end: usize, limits: &Limits) -> String {
    let mut text = suffix_chars(page, title_end).to_owned();
    text = CONVERT_DISTANCE
        .replace_all(&text, DELETED_DISTANCE)
        .into_owned();
    text = TEMPLATE.replace_all(&text, "").into_owned();
    text = ENCODED_ANGLE.replace_all(&text, " ").into_owned();
    text = REF_NAME.replace_all(&text, " ").into_owned();
    text = text.replace("nbsp;", " ");
    text = HTML_ESCAPE.replace_all(&text, " ").into_owned();
    text = LOOSE_PUNCT.replace_all(&text, " ").into_owned();
    text = EMPTY_PARENS.replace_all(&text, "").into_owned();
    text.chars().take(limits.segment_characters_size).collect()
}

// A period ends the sentence unless it sits inside a link token.
fn ends_sentence(token: &str) -> bool {
    token.ends_with("]].") || (token.ends_with('.') && !token.to_lowercase().starts_with("[["))
}

fn first_verb_index(tokens: &[&str], max_words_till_verb: usize) -> Option<usize> {
    for (i, token) in tokens.iter().enumerate() {
        if token.len() <= 1 {
            continue;
        }
        // Too far from the title to still be the opening copula.
        if i >= max_words_till_verb {
            return None;
        }
        if ends_sentence(token) {
            return None;
        }
        if RELEVANT_VERBS.contains(&token.trim().to_lowercase().as_str()) {
            return Some(i);
        }
    }
    None
}

fn first_preposition_index(tokens: &[&str], verb_index: usize) -> Option<usize> {
    for (i, token) in tokens.iter().enumerate().skip(verb_index + 1) {
        if ends_sentence(token) {
            return None;
        }
        if RELEVANT_PREPOSITIONS.contains(&token.trim().to_lowercase().as_str()) {
            return Some(i);
        }
    }
    None
}
