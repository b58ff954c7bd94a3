//! "Located-at" phrase evidence: an explicit location appearing right after
//! phrases such as "located in" or "headquartered at".
//!
//! A single wrongly extracted location can be very far off, so several
//! validations reject low-confidence records: the phrase must sit near the
//! article's start and before the first period, the sentence must not state a
//! distance ("located 600 miles south of ..."), and the link entities around
//! the phrase must not span a larger diameter than configured. Candidate
//! word sequences grow word by word; a longer sequence that is an entity
//! without coordinates discards any shorter location found at the same
//! starting word ("Paris, Texas" must not degrade to "Paris").

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::Limits;
use crate::coordinates::Coordinates;
use crate::parse::article_type::ArticleType;
use crate::parse::clean_text::clean_text;
use crate::parse::{find_ignore_ascii_case, suffix_chars, wiki_title};

/// Link-entity types narrower than countries take part in the diameter test.
const MIN_DIAMETER_PRIORITY: i32 = 3;

const RELEVANT_PHRASES: [&str; 12] = [
    "located in ",
    "located at ",
    "located outside ",
    "located inside ",
    "located east ",
    "located west ",
    "located north ",
    "located south ",
    "located near ",
    "headquartered in ",
    "headquartered at ",
    "found in ",
];

static DISTANCE_IN_SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2,}\s+(nautical\s+)?(km|kilomet|mile)").unwrap());
static DISTANCE_CONVERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{convert\|\d{2,}\|").unwrap());
static ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[(.*?)(\||(]]))").unwrap());
// The clean text has headings removed, so a section boundary shows up as a
// whitespace-only line; match an explicit heading too for robustness.
static SECTION_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\n\s+\n)|(==.*?==)").unwrap());

/// Read-only lookup tables shared by the phrase parsers.
pub struct LocationContext<'a> {
    pub coordinates: &'a HashMap<String, Coordinates>,
    pub article_types: &'a HashMap<String, ArticleType>,
    pub redirects: &'a HashMap<String, String>,
}

enum SequenceResult {
    Location(String),
    NotLocation,
    /// An entity without coordinates: discard shorter locations found at the
    /// same starting word.
    IsEntityNotLocation,
}

/// Extracts the explicit located-at target of one record, if any.
pub fn parse_located_at(
    title: &str,
    page: &str,
    ctx: &LocationContext<'_>,
    limits: &Limits,
) -> Option<String> {
    let clean = clean_text(title, page);

    let mut best_index = usize::MAX;
    let mut best: Option<String> = None;

    for phrase in RELEVANT_PHRASES {
        let Some(index) = clean.find(phrase) else {
            continue;
        };
        if index >= best_index {
            continue;
        }

        // The phrase must belong to the opening sentence, close to the start.
        let in_first_sentence = clean.find('.').is_some_and(|p| p > index);
        let words_to_phrase = clean[..index].split_whitespace().count();
        if !in_first_sentence || words_to_phrase >= limits.max_words_till_phrase {
            continue;
        }

        if let Some(location) = extract_location(&clean, page, phrase, index, ctx, limits) {
            best_index = index;
            best = Some(location);
        }
    }

    best
}

fn extract_location(
    clean: &str,
    page: &str,
    phrase: &str,
    index: usize,
    ctx: &LocationContext<'_>,
    limits: &Limits,
) -> Option<String> {
    let mut line: String = clean[index + phrase.len()..]
        .chars()
        .take(limits.max_characters_post_phrase)
        .collect();
    if let Some(m) = SECTION_TITLE.find(&line) {
        line.truncate(m.start());
    }

    let full = relevant_full_text(page, phrase, limits);
    if scattered_entities(&full, ctx, limits) {
        return None;
    }

    let full_lower = full.to_lowercase();
    if DISTANCE_IN_SENTENCE.is_match(&line.to_lowercase())
        || DISTANCE_CONVERSION.is_match(&full_lower)
    {
        return None;
    }

    let words: Vec<&str> = line.split_whitespace().collect();

    for i in 0..words.len() {
        // A location after a bare "new" is suspect: "New York" appearing only
        // as prose must not be read as "York".
        if i > 0 && words[i - 1].trim().to_lowercase() == "new" {
            continue;
        }

        let mut sequence: Vec<&str> = Vec::new();
        let mut best_found: Option<String> = None;

        for &word in &words[i..] {
            sequence.push(word);
            match try_sequence(&full_lower, &sequence, ctx) {
                SequenceResult::Location(found) => best_found = Some(found),
                SequenceResult::NotLocation => {}
                SequenceResult::IsEntityNotLocation => best_found = None,
            }
        }

        // The first starting word that yields a location wins, with the
        // longest valid sequence from that word.
        if best_found.is_some() {
            return best_found;
        }
    }

    None
}

fn try_sequence(
    full_lower: &str,
    sequence: &[&str],
    ctx: &LocationContext<'_>,
) -> SequenceResult {
    let mut tested = sequence.join("_").trim().to_owned();
    if tested
        .chars()
        .last()
        .is_some_and(|c| matches!(c, ',' | '.' | ';' | '?' | '!' | '-' | '%' | '#'))
    {
        tested.pop();
    }
    if tested.is_empty() {
        return SequenceResult::NotLocation;
    }

    // Titles always start with a capital; running text not necessarily.
    let mut chars = tested.chars();
    let first = chars.next().unwrap();
    if !first.is_uppercase() {
        tested = first.to_uppercase().chain(chars).collect();
    }

    let redirect = ctx.redirects.get(&tested).map(String::as_str);
    if not_entity(full_lower, Some(tested.as_str())) && not_entity(full_lower, redirect) {
        return SequenceResult::NotLocation;
    }

    if ctx.coordinates.contains_key(&tested) {
        return SequenceResult::Location(tested);
    }
    if let Some(redirect) = redirect {
        let resolved = wiki_title(redirect);
        if ctx.coordinates.contains_key(&resolved) {
            return SequenceResult::Location(resolved);
        }
    }

    SequenceResult::IsEntityNotLocation
}

// A candidate is an entity only when the raw markup links it, either alone
// ("[[x]]") or as the official variant of a piped link ("[[x|").
fn not_entity(full_lower: &str, candidate: Option<&str>) -> bool {
    let Some(candidate) = candidate else {
        return true;
    };
    let s = candidate.replace('_', " ").to_lowercase();
    !full_lower.contains(&format!("[[{s}|")) && !full_lower.contains(&format!("[[{s}]]"))
}

// The raw-text window around the phrase in which entities are searched.
fn relevant_full_text(page: &str, phrase: &str, limits: &Limits) -> String {
    let Some(index) = find_ignore_ascii_case(page, phrase) else {
        // The clean text contained the phrase but the raw text does not;
        // can happen when markup removal glued words together.
        return String::new();
    };
    suffix_chars(page, index)
        .chars()
        .take(limits.max_characters_post_phrase * 2)
        .collect()
}

// When the linked entities around the phrase are spread further apart than
// the configured diameter, any single extracted location would be a guess.
fn scattered_entities(full: &str, ctx: &LocationContext<'_>, limits: &Limits) -> bool {
    let mut entities: Vec<String> = ENTITY
        .captures_iter(full)
        .map(|c| wiki_title(c.get(1).unwrap().as_str()))
        .collect();

    let resolved: Vec<String> = entities
        .iter()
        .filter_map(|e| ctx.redirects.get(e))
        .map(|target| wiki_title(target))
        .collect();
    entities.extend(resolved);

    let coordinates: Vec<&Coordinates> = entities
        .iter()
        .filter(|e| {
            ctx.article_types
                .get(*e)
                .is_some_and(|t| t.location_priority() >= MIN_DIAMETER_PRIORITY)
        })
        .filter_map(|e| ctx.coordinates.get(e))
        .collect();

    for (i, a) in coordinates.iter().enumerate() {
        for b in &coordinates[i + 1..] {
            if a.distance_km(b) > limits.max_entities_diameter_km {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits {
            max_vector_elements: 100,
            max_named_locations_per_article: 20,
            max_word_index: 500,
            max_words_till_verb: 12,
            segment_characters_size: 400,
            max_words_till_phrase: 40,
            max_characters_post_phrase: 100,
            max_entities_diameter_km: 500.0,
            max_index_for_title_removal: 50,
            max_title_length_for_removal: 80,
        }
    }

    fn wrap(body: &str) -> String {
        format!("<title>Foo</title>\n<text xml:space=\"preserve\">{body}</text>")
    }

    fn coords(titles: &[&str]) -> HashMap<String, Coordinates> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| {
                (
                    t.to_string(),
                    Coordinates::new(10.0 + i as f64 * 0.01, 20.0).unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn test_simple_located_in() {
        let page = wrap("'''Foo''' is located in [[Paris]], France. More text.");
        let coordinates = coords(&["Paris"]);
        let ctx = LocationContext {
            coordinates: &coordinates,
            article_types: &HashMap::new(),
            redirects: &HashMap::new(),
        };
        assert_eq!(
            parse_located_at("Foo", &page, &ctx, &limits()),
            Some("Paris".to_owned())
        );
    }

    #[test]
    fn test_headquartered_phrase() {
        let page = wrap("'''Foo''' is a firm headquartered in [[Geneva]] since 1990. End.");
        let coordinates = coords(&["Geneva"]);
        let ctx = LocationContext {
            coordinates: &coordinates,
            article_types: &HashMap::new(),
            redirects: &HashMap::new(),
        };
        assert_eq!(
            parse_located_at("Foo", &page, &ctx, &limits()),
            Some("Geneva".to_owned())
        );
    }

    #[test]
    fn test_distance_sentence_rejected() {
        let page = wrap("'''Foo''' is located near [[Paris]] 600 miles up the road. End.");
        let coordinates = coords(&["Paris"]);
        let ctx = LocationContext {
            coordinates: &coordinates,
            article_types: &HashMap::new(),
            redirects: &HashMap::new(),
        };
        assert_eq!(parse_located_at("Foo", &page, &ctx, &limits()), None);
    }

    #[test]
    fn test_convert_template_rejected() {
        let page = wrap(
            "'''Foo''' is located near [[Paris]] some {{convert|600|km|mi}} away. End.",
        );
        let coordinates = coords(&["Paris"]);
        let ctx = LocationContext {
            coordinates: &coordinates,
            article_types: &HashMap::new(),
            redirects: &HashMap::new(),
        };
        assert_eq!(parse_located_at("Foo", &page, &ctx, &limits()), None);
    }

    #[test]
    fn test_longer_entity_without_coordinates_discards_prefix() {
        // "Paris, Texas" is linked but has no coordinates; bare "Paris" must
        // not be extracted from the same starting word.
        let page = wrap("'''Foo''' is located in [[Paris, Texas]] county. End.");
        let coordinates = coords(&["Paris"]);
        let ctx = LocationContext {
            coordinates: &coordinates,
            article_types: &HashMap::new(),
            redirects: &HashMap::new(),
        };
        assert_eq!(parse_located_at("Foo", &page, &ctx, &limits()), None);
    }

    #[test]
    fn test_redirect_resolution() {
        let page = wrap("'''Foo''' is located in [[NYC]] proper. End.");
        let coordinates = coords(&["New_York_City"]);
        let mut redirects = HashMap::new();
        redirects.insert("NYC".to_owned(), "New York City".to_owned());
        let ctx = LocationContext {
            coordinates: &coordinates,
            article_types: &HashMap::new(),
            redirects: &redirects,
        };
        assert_eq!(
            parse_located_at("Foo", &page, &ctx, &limits()),
            Some("New_York_City".to_owned())
        );
    }

    #[test]
    fn test_scattered_entities_rejected() {
        // Two linked spots ~2000 km apart exceed the 500 km diameter bound.
        let page = wrap("'''Foo''' is located in [[Near Spot]] by [[Far Spot]]. End.");
        let mut coordinates = HashMap::new();
        coordinates.insert("Near_Spot".to_owned(), Coordinates::new(10.0, 20.0).unwrap());
        coordinates.insert("Far_Spot".to_owned(), Coordinates::new(28.0, 20.0).unwrap());
        let mut types = HashMap::new();
        types.insert("Near_Spot".to_owned(), ArticleType::Spot);
        types.insert("Far_Spot".to_owned(), ArticleType::Spot);
        let ctx = LocationContext {
            coordinates: &coordinates,
            article_types: &types,
            redirects: &HashMap::new(),
        };
        assert_eq!(parse_located_at("Foo", &page, &ctx, &limits()), None);
    }

    #[test]
    fn test_phrase_after_first_period_rejected() {
        let page = wrap("'''Foo''' is a thing. It is located in [[Paris]] today. End.");
        let coordinates = coords(&["Paris"]);
        let ctx = LocationContext {
            coordinates: &coordinates,
            article_types: &HashMap::new(),
            redirects: &HashMap::new(),
        };
        assert_eq!(parse_located_at("Foo", &page, &ctx, &limits()), None);
    }

    #[test]
    fn test_unlinked_word_not_extracted() {
        // "Paris" has coordinates but is not linked in the record.
        let page = wrap("'''Foo''' is located in Paris without a link. End.");
        let coordinates = coords(&["Paris"]);
        let ctx = LocationContext {
            coordinates: &coordinates,
            article_types: &HashMap::new(),
            redirects: &HashMap::new(),
        };
        assert_eq!(parse_located_at("Foo", &page, &ctx, &limits()), None);
    }
}
