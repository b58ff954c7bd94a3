//! Per-article score vectors: the TF-IDF text vector and the named-location
//! vector.
//!
//! Both are pairs of parallel arrays (ids ascending, f32 scores), truncated
//! to a configured top-k by score and L2-normalised. The id spaces differ:
//! term ids for text, title ids for named locations.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ordered_float::OrderedFloat;
use parking_lot::Mutex;

use crate::binio::{self, DiskRecord};
use crate::config::Config;
use crate::coordinates::Coordinates;
use crate::dictionary::Dictionary;
use crate::error::Result;
use crate::extractor::{scan_articles, ExtractOptions};
use crate::parse::clean_text::clean_text;
use crate::parse::entities::parse_contained_entities;
use crate::parse::wiki_title;
use crate::registry::StringIdRegistry;
use crate::tokenizer::{filter_stop_words, tokenize};

/// Parallel `(ids ascending, scores)` arrays; L2 norm 1 unless empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoresVector {
    pub ids: Vec<u32>,
    pub scores: Vec<f32>,
}

impl ScoresVector {
    /// Builds a vector from scored pairs: keeps the `max_elements` highest
    /// scores (ties resolved by the order given), sorts by id ascending and
    /// L2-normalises. Pairs whose scores are all zero produce an empty
    /// vector, as do empty inputs.
    pub fn top_k(mut pairs: Vec<(u32, f32)>, max_elements: usize) -> ScoresVector {
        if pairs.len() > max_elements {
            pairs.sort_by_key(|&(_, score)| std::cmp::Reverse(OrderedFloat(score)));
            pairs.truncate(max_elements);
        }
        pairs.sort_unstable_by_key(|&(id, _)| id);

        let norm = pairs
            .iter()
            .map(|&(_, s)| f64::from(s) * f64::from(s))
            .sum::<f64>()
            .sqrt();
        if norm == 0.0 {
            return ScoresVector::default();
        }

        let mut ids = Vec::with_capacity(pairs.len());
        let mut scores = Vec::with_capacity(pairs.len());
        for (id, score) in pairs {
            ids.push(id);
            scores.push((f64::from(score) / norm) as f32);
        }
        ScoresVector { ids, scores }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Layout: `N`, then per article `title`, `k`, `k x id`, `k`, `k x f32`.
impl DiskRecord for HashMap<String, ScoresVector> {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut keys: Vec<&String> = self.keys().collect();
        keys.sort_unstable();
        w.write_u32::<LittleEndian>(self.len() as u32)?;
        for key in keys {
            binio::write_string(w, key)?;
            let vector = &self[key];
            w.write_u32::<LittleEndian>(vector.ids.len() as u32)?;
            for &id in &vector.ids {
                w.write_u32::<LittleEndian>(id)?;
            }
            w.write_u32::<LittleEndian>(vector.scores.len() as u32)?;
            for &score in &vector.scores {
                w.write_f32::<LittleEndian>(score)?;
            }
        }
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let n = r.read_u32::<LittleEndian>()?;
        let mut map = HashMap::with_capacity(n as usize);
        for _ in 0..n {
            let title = binio::read_string(r)?;
            let id_count = r.read_u32::<LittleEndian>()?;
            let mut ids = Vec::with_capacity(id_count as usize);
            for _ in 0..id_count {
                ids.push(r.read_u32::<LittleEndian>()?);
            }
            let score_count = r.read_u32::<LittleEndian>()?;
            let mut scores = Vec::with_capacity(score_count as usize);
            for _ in 0..score_count {
                scores.push(r.read_f32::<LittleEndian>()?);
            }
            map.insert(title, ScoresVector { ids, scores });
        }
        Ok(map)
    }
}

/// Computes one article's TF-IDF vector from its filtered tokens.
/// Term frequency is counted in appearance order so that top-k ties resolve
/// the way the text reads; unknown terms are skipped.
pub fn tf_idf_vector(words: &[String], dictionary: &Dictionary, max_elements: usize) -> ScoresVector {
    let mut order: Vec<(u32, u32)> = Vec::new();
    let mut positions: HashMap<u32, usize> = HashMap::new();
    for word in words {
        let Some(id) = dictionary.word_to_id(word) else {
            continue;
        };
        match positions.get(&id) {
            Some(&at) => order[at].1 += 1,
            None => {
                positions.insert(id, order.len());
                order.push((id, 1));
            }
        }
    }

    let scored: Vec<(u32, f32)> = order
        .into_iter()
        .map(|(id, tf)| {
            let score = (1.0 + f64::from(tf)).log10() * dictionary.log_idf(Some(id));
            (id, score as f32)
        })
        .collect();

    ScoresVector::top_k(scored, max_elements)
}

/// Builds (or loads) the TF-IDF vector of every article.
pub fn build_tf_idf_vectors(
    cfg: &Config,
    dictionary: &Arc<Dictionary>,
) -> Result<HashMap<String, ScoresVector>> {
    let max_elements = cfg.limits.max_vector_elements;
    binio::load_or_build("tf-idf vectors", &cfg.paths.tf_idf_vectors, || {
        let vectors = Arc::new(Mutex::new(HashMap::new()));
        let sink = Arc::clone(&vectors);
        let dictionary = Arc::clone(dictionary);
        scan_articles(cfg, ExtractOptions::default(), move |record| {
            let text = clean_text(&record.title, &record.text);
            let words = filter_stop_words(tokenize(&text, true));
            let vector = tf_idf_vector(&words, &dictionary, max_elements);
            sink.lock().insert(record.title, vector);
        })?;
        let vectors = Arc::into_inner(vectors).expect("workers joined");
        Ok(vectors.into_inner())
    })
}

/// One article's counted named locations, ordered by first appearance.
pub type NamedLocationCounts = Vec<(u32, u32)>;

/// Builds (or loads) the named-location vector of every article.
///
/// Every contained entity is resolved to a coordinated title (directly or
/// through a redirect); its variants are counted in the clean text with
/// delimiter-bounded, non-overlapping matching. Entities that never occur in
/// the prose or first occur too deep into the article are dropped. The
/// redirect-resolved title is the stored key.
pub fn build_named_location_vectors(
    cfg: &Config,
    titles: &Arc<StringIdRegistry>,
    coordinates: &Arc<HashMap<String, Coordinates>>,
    redirects: &Arc<HashMap<String, String>>,
) -> Result<HashMap<String, ScoresVector>> {
    let limits = cfg.limits.clone();
    binio::load_or_build(
        "named-location vectors",
        &cfg.paths.named_location_vectors,
        || {
            let vectors = Arc::new(Mutex::new(HashMap::new()));
            let sink = Arc::clone(&vectors);
            let titles = Arc::clone(titles);
            let coordinates = Arc::clone(coordinates);
            let redirects = Arc::clone(redirects);
            scan_articles(cfg, ExtractOptions::default(), move |record| {
                let parsed = parse_contained_entities(&record.title, &record.text, &limits);
                let counts = named_location_counts(
                    &parsed.entities,
                    &parsed.clean_text,
                    &titles,
                    &coordinates,
                    &redirects,
                    limits.max_word_index,
                );
                let vector = location_scores(&counts, limits.max_named_locations_per_article);
                sink.lock().insert(record.title, vector);
            })?;
            let vectors = Arc::into_inner(vectors).expect("workers joined");
            Ok(vectors.into_inner())
        },
    )
}

/// Resolves and counts one article's named locations.
pub fn named_location_counts(
    entities: &HashMap<String, (i32, std::collections::HashSet<String>)>,
    clean_lower: &str,
    titles: &StringIdRegistry,
    coordinates: &HashMap<String, Coordinates>,
    redirects: &HashMap<String, String>,
    max_word_index: i32,
) -> NamedLocationCounts {
    let mut located: Vec<(String, i32, u32)> = Vec::new();

    for (official, (first_index, variants)) in entities {
        let mut resolved = wiki_title(official);
        if !coordinates.contains_key(&resolved) {
            let Some(redirect) = redirects.get(&resolved) else {
                continue;
            };
            resolved = wiki_title(redirect);
            if !coordinates.contains_key(&resolved) {
                continue;
            }
        }

        let searchable = searchable_variants(variants);
        let count: u32 = searchable
            .iter()
            .map(|v| count_delimited(clean_lower, v))
            .sum();

        located.push((resolved, *first_index, count));
    }

    // Locations that never occur in the prose carry no signal; ones first
    // seen deep into the article rarely describe the subject's place.
    located.retain(|&(_, first, count)| count > 0 && first <= max_word_index);
    located.sort_by_key(|&(_, first, _)| first);

    located
        .into_iter()
        .filter_map(|(title, _, count)| {
            match titles.id(&title) {
                Some(id) => Some((id, count)),
                None => {
                    tracing::debug!("named location '{title}' has no title id, skipping");
                    None
                }
            }
        })
        .collect()
}

// Keeps only variants that are not substrings of a longer variant in the
// same set; the longer form is the unambiguous one to count.
fn searchable_variants(variants: &std::collections::HashSet<String>) -> Vec<&String> {
    variants
        .iter()
        .filter(|v| {
            !v.is_empty()
                && !variants
                    .iter()
                    .any(|other| other != *v && other.contains(v.as_str()))
        })
        .collect()
}

const PREFIX_DELIMS: [char; 10] = [' ', '\n', '[', '{', '(', '-', '_', '"', '\'', '|'];
const SUFFIX_DELIMS: [char; 17] = [
    ' ', '\n', '[', '{', '(', '-', '_', '"', '\'', '|', ',', '.', '?', '!', ']', '}', ')',
];

// Non-overlapping, delimiter-bounded occurrence count; the scan advances by
// the variant's length after each hit.
fn count_delimited(text: &str, variant: &str) -> u32 {
    let mut count = 0;
    let mut from = 0;
    while let Some(rel) = text[from..].find(variant) {
        let start = from + rel;
        let end = start + variant.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        if before.is_some_and(|c| PREFIX_DELIMS.contains(&c))
            && after.is_some_and(|c| SUFFIX_DELIMS.contains(&c))
        {
            count += 1;
        }
        from = end;
    }
    count
}

/// Transforms counts into the stored vector: `score = sqrt(count / total)`,
/// top-k, L2-normalised, id-ascending.
pub fn location_scores(counts: &NamedLocationCounts, max_elements: usize) -> ScoresVector {
    let total: u32 = counts.iter().map(|&(_, c)| c).sum();
    if total == 0 {
        return ScoresVector::default();
    }
    let scored: Vec<(u32, f32)> = counts
        .iter()
        .map(|&(id, count)| (id, (f64::from(count) / f64::from(total)).sqrt() as f32))
        .collect();
    ScoresVector::top_k(scored, max_elements)
}
