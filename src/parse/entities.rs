//! Link-entity extraction: every `[[X]]` / `[[X|a|b]]` reference in a record.
//!
//! For each entity the parser records the word index of its first appearance
//! in the clean text (so very-early named locations can be recognised) and
//! every naming variant supplied by the wiki markup. The word index is only
//! advanced to occurrences NOT immediately preceded by `new ` — otherwise
//! "New York" would masquerade as "York".

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::Limits;
use crate::parse::clean_text::clean_text;

static WIKI_ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[ *(.*?) *]]").unwrap());

/// All link entities of one record, keyed by the official (first) variant in
/// its original casing. The value is the first-appearance word index (−1 when
/// the entity never occurs in the clean text) and the lowercased variant set.
#[derive(Debug, Default)]
pub struct ContainedEntities {
    /// The record's clean text, lowercased, with the bolded title removed.
    pub clean_text: String,
    pub entities: HashMap<String, (i32, HashSet<String>)>,
}

/// Parses the contained entities of one record.
pub fn parse_contained_entities(title: &str, page: &str, limits: &Limits) -> ContainedEntities {
    let text = clean_text(title, page).to_lowercase();
    let text = remove_bold_title(text, limits);

    let page_title = title.replace('_', " ").to_lowercase();
    let mut entities: HashMap<String, (i32, HashSet<String>)> = HashMap::new();

    for caps in WIKI_ENTITY.captures_iter(page) {
        let entity = caps.get(1).unwrap().as_str();

        // "Category:...", "File:..." and friends are not articles.
        if entity.contains(':') {
            continue;
        }

        let mut variants = entity.split('|');
        let Some(official) = variants.next() else {
            continue;
        };
        if official.is_empty() {
            continue;
        }

        // Rare, but a link to the page itself is not a contained entity.
        if official.to_lowercase() == page_title {
            continue;
        }

        let entry = entities.entry(official.to_owned()).or_insert_with(|| {
            let index = first_word_index(&text, &official.to_lowercase());
            (index, HashSet::new())
        });
        entry.1.insert(official.to_lowercase());
        for variant in variants {
            entry.1.insert(variant.to_lowercase());
        }
    }

    ContainedEntities {
        clean_text: text,
        entities,
    }
}

// Strips a leading '''<title>''' pair so word indices count from the actual
// prose. Both markers must sit within their configured distance bounds.
fn remove_bold_title(text: String, limits: &Limits) -> String {
    let Some(open) = text.find("'''") else {
        return text;
    };
    if open > limits.max_index_for_title_removal {
        return text;
    }
    let after_open = text[open + 3..].to_owned();

    let Some(close) = after_open.find("'''") else {
        return after_open;
    };
    if close > limits.max_title_length_for_removal {
        return after_open;
    }
    after_open[close + 3..].to_owned()
}

// Word index of the first occurrence of `official` that is not preceded by
// the literal " new ". Returns −1 when the entity does not occur.
fn first_word_index(text: &str, official: &str) -> i32 {
    if official.is_empty() {
        return -1;
    }
    let mut from = 0;
    while let Some(rel) = text[from..].find(official) {
        let index = from + rel;
        if index > 5 && text.get(index - 5..index) == Some(" new ") {
            from = index + official.len();
            continue;
        }
        return text[..index].trim().split_whitespace().count() as i32;
    }
    -1
}
