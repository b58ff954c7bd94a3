//! Typed configuration loaded from a flat `key = value` properties file.
//!
//! The file is read once at startup. Every recognised key is mandatory: a
//! missing or empty value is a fatal configuration error naming the offending
//! key. The parsed [`Config`] is passed by reference down the build graph;
//! there are no globals.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Fully-resolved output file paths, one per persisted structure.
#[derive(Debug, Clone)]
pub struct Paths {
    pub dictionary: PathBuf,
    pub titles: PathBuf,
    pub category_ids: PathBuf,
    pub coordinates: PathBuf,
    pub redirects: PathBuf,
    pub tf_idf_vectors: PathBuf,
    pub named_location_vectors: PathBuf,
    pub article_categories: PathBuf,
    pub article_types: PathBuf,
    pub located_at: PathBuf,
    pub is_a_in: PathBuf,
    pub index_words: PathBuf,
    pub index_words_coords: PathBuf,
    pub index_categories: PathBuf,
    pub index_categories_coords: PathBuf,
    pub index_named_locations: PathBuf,
    pub index_named_locations_coords: PathBuf,
    pub neighbors_dir: PathBuf,
    pub neighbors_file_stem: String,
}

/// Bounds applied by the field parsers and vector builders.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Top-k cap on TF-IDF vector length.
    pub max_vector_elements: usize,
    /// Top-k cap on named-location vector length.
    pub max_named_locations_per_article: usize,
    /// Named locations first seen past this word index are dropped.
    pub max_word_index: i32,
    /// "Is-a-in": the verb must occur within this many words of the title.
    pub max_words_till_verb: usize,
    /// "Is-a-in": size in characters of the scanned segment after the title.
    pub segment_characters_size: usize,
    /// "Located-at": the phrase must occur within this many words of the start.
    pub max_words_till_phrase: usize,
    /// "Located-at": candidate locations are searched this far past the phrase.
    pub max_characters_post_phrase: usize,
    /// "Located-at": reject when linked entities span more than this many km.
    pub max_entities_diameter_km: f64,
    /// Contained entities: title prefix removal only within this many chars.
    pub max_index_for_title_removal: usize,
    /// Contained entities: maximal title length considered for removal.
    pub max_title_length_for_removal: usize,
}

/// Quick-pruner scratch sizing.
#[derive(Debug, Clone, Copy)]
pub struct PrunerConfig {
    /// Scratch array length; must exceed every article, term and category id.
    pub memory_size: usize,
    /// Iteration counter value at which the scratch is zeroed and restarted.
    pub max_iteration: u32,
}

/// Similarity component weights. Always sum to exactly 1.
#[derive(Debug, Clone, Copy)]
pub struct Weights {
    pub tf_idf: f64,
    pub named_locations: f64,
    pub categories: f64,
}

impl Weights {
    /// Parses a comma-separated triple where each entry is either a decimal
    /// (`0.5`) or a literal fraction (`1/3`). The fraction form exists so
    /// that `1/3,1/3,1/3` can sum to exactly 1.
    pub fn parse(value: &str) -> Result<Weights> {
        let bad = || Error::BadValue {
            key: "geodex.nearest_neighbors.weights".into(),
            value: value.into(),
        };

        let parts: Vec<&str> = value.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(bad());
        }

        let mut parsed = [0f64; 3];
        for (slot, part) in parsed.iter_mut().zip(&parts) {
            *slot = match part.split_once('/') {
                Some((p, q)) => {
                    let p: f64 = p.trim().parse().map_err(|_| bad())?;
                    let q: f64 = q.trim().parse().map_err(|_| bad())?;
                    p / q
                }
                None => part.parse().map_err(|_| bad())?,
            };
        }

        let sum = parsed[0] + parsed[1] + parsed[2];
        if sum != 1.0 {
            return Err(Error::BadWeights(sum));
        }

        Ok(Weights {
            tf_idf: parsed[0],
            named_locations: parsed[1],
            categories: parsed[2],
        })
    }
}

/// Nearest-neighbor phase parameters.
#[derive(Debug, Clone)]
pub struct NeighborsConfig {
    /// Number of worker threads; the article set is split into this many chunks.
    pub workers: usize,
    /// Minimal shared top-word count for a pruning candidate.
    pub tf_idf_threshold: u32,
    /// Minimal shared named-location count for a pruning candidate.
    pub named_locations_threshold: u32,
    /// Minimal shared category count for a pruning candidate.
    pub categories_threshold: u32,
    /// Neighbors scoring below this are not stored.
    pub min_similarity: f32,
    /// Cap on stored neighbors per article.
    pub max_neighbors: usize,
    pub weights: Weights,
}

/// The complete parsed configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the raw Wikipedia XML dump.
    pub wiki_xml: PathBuf,
    pub paths: Paths,
    pub limits: Limits,
    pub pruner: PrunerConfig,
    pub neighbors: NeighborsConfig,
    /// Bounded wait when joining a worker pool, in milliseconds.
    pub executor_wait_millis: u64,
}

impl Config {
    /// Loads and validates the configuration file. Any missing or
    /// unparseable key fails the whole run.
    pub fn load(path: &Path) -> Result<Config> {
        let raw = Properties::read(path)?;

        let base = PathBuf::from(raw.string("geodex.base_path")?);
        let articles_dir = base.join(raw.string("geodex.articles.folder")?);
        let categories_dir = base.join(raw.string("geodex.categories.folder")?);
        let index_dir = base.join(raw.string("geodex.inverted_index.folder")?);
        let dictionary_dir = base.join(raw.string("geodex.dictionary.folder")?);
        let neighbors_dir = base.join(raw.string("geodex.nearest_neighbors.folder")?);

        let paths = Paths {
            dictionary: dictionary_dir.join(raw.string("geodex.dictionary.file_name")?),
            titles: articles_dir.join(raw.string("geodex.articles.titles_to_ids.file_name")?),
            category_ids: categories_dir.join(raw.string("geodex.categories.ids_file_name")?),
            coordinates: articles_dir.join(raw.string("geodex.articles.coordinates.file_name")?),
            redirects: articles_dir.join(raw.string("geodex.articles.redirects.file_name")?),
            tf_idf_vectors: articles_dir
                .join(raw.string("geodex.articles.tf_idf_vectors.file_name")?),
            named_location_vectors: articles_dir
                .join(raw.string("geodex.articles.named_location_vectors.file_name")?),
            article_categories: articles_dir
                .join(raw.string("geodex.articles.categories.file_name")?),
            article_types: articles_dir.join(raw.string("geodex.articles.types.file_name")?),
            located_at: articles_dir.join(raw.string("geodex.articles.located_at.file_name")?),
            is_a_in: articles_dir.join(raw.string("geodex.articles.is_a_in.file_name")?),
            index_words: index_dir.join(raw.string("geodex.inverted_index.words.file_name")?),
            index_words_coords: index_dir
                .join(raw.string("geodex.inverted_index.words_with_coordinates.file_name")?),
            index_categories: index_dir
                .join(raw.string("geodex.inverted_index.categories.file_name")?),
            index_categories_coords: index_dir
                .join(raw.string("geodex.inverted_index.categories_with_coordinates.file_name")?),
            index_named_locations: index_dir
                .join(raw.string("geodex.inverted_index.named_locations.file_name")?),
            index_named_locations_coords: index_dir.join(
                raw.string("geodex.inverted_index.named_locations_with_coordinates.file_name")?,
            ),
            neighbors_dir,
            neighbors_file_stem: raw.string("geodex.nearest_neighbors.file_name")?.to_owned(),
        };

        let limits = Limits {
            max_vector_elements: raw.usize("geodex.articles.max_terms_vector_size")?,
            max_named_locations_per_article: raw
                .usize("geodex.articles.max_named_locations_per_article")?,
            max_word_index: raw.parse("geodex.articles.max_word_index_for_named_locations")?,
            max_words_till_verb: raw.usize("geodex.articles.is_a_in.max_words_till_verb")?,
            segment_characters_size: raw
                .usize("geodex.articles.is_a_in.segment_characters_size")?,
            max_words_till_phrase: raw
                .usize("geodex.articles.located_at.max_words_till_phrase")?,
            max_characters_post_phrase: raw
                .usize("geodex.articles.located_at.max_characters_post_phrase")?,
            max_entities_diameter_km: raw
                .parse("geodex.articles.located_at.max_entities_diameter")?,
            max_index_for_title_removal: raw
                .usize("geodex.articles.entities.max_index_for_title_removal")?,
            max_title_length_for_removal: raw
                .usize("geodex.articles.entities.max_title_length_for_removal")?,
        };

        let pruner = PrunerConfig {
            memory_size: raw.usize("geodex.pruner.memory_size")?,
            max_iteration: raw.parse("geodex.pruner.max_iteration")?,
        };

        let neighbors = NeighborsConfig {
            workers: raw.usize("geodex.nearest_neighbors.workers")?,
            tf_idf_threshold: raw.parse("geodex.nearest_neighbors.tf_idf_pruning_threshold")?,
            named_locations_threshold: raw
                .parse("geodex.nearest_neighbors.named_locations_pruning_threshold")?,
            categories_threshold: raw
                .parse("geodex.nearest_neighbors.categories_pruning_threshold")?,
            min_similarity: raw.parse("geodex.nearest_neighbors.min_similarity")?,
            max_neighbors: raw.usize("geodex.nearest_neighbors.max_neighbors")?,
            weights: Weights::parse(raw.string("geodex.nearest_neighbors.weights")?)?,
        };

        Ok(Config {
            wiki_xml: base.join(raw.string("geodex.wiki_xml_file")?),
            paths,
            limits,
            pruner,
            neighbors,
            executor_wait_millis: raw.parse("geodex.executor.termination_wait_millis")?,
        })
    }

    /// The nearest-neighbors output path. The file name embeds the weight
    /// triple so differently-weighted runs can coexist.
    pub fn neighbors_file(&self) -> PathBuf {
        let w = &self.neighbors.weights;
        let name = format!(
            "{}_tf-idf={}_named-locations={}_categories={}",
            self.paths.neighbors_file_stem,
            fmt_weight(w.tf_idf),
            fmt_weight(w.named_locations),
            fmt_weight(w.categories),
        );
        self.paths.neighbors_dir.join(name)
    }
}

// Two decimal places with trailing zeros (and a bare point) trimmed.
fn fmt_weight(w: f64) -> String {
    let mut s = format!("{w:.2}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

/// A raw `key = value` properties file. Lines starting with `#` and blank
/// lines are ignored.
struct Properties {
    values: HashMap<String, String>,
}

impl Properties {
    fn read(path: &Path) -> Result<Properties> {
        let text = fs::read_to_string(path)?;
        let mut values = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                values.insert(key.trim().to_owned(), value.trim().to_owned());
            }
        }
        Ok(Properties { values })
    }

    fn string(&self, key: &str) -> Result<&str> {
        match self.values.get(key).map(String::as_str) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(Error::MissingKey(key.to_owned())),
        }
    }

    fn parse<T: std::str::FromStr>(&self, key: &str) -> Result<T> {
        let value = self.string(key)?;
        value.parse().map_err(|_| Error::BadValue {
            key: key.to_owned(),
            value: value.to_owned(),
        })
    }

    fn usize(&self, key: &str) -> Result<usize> {
        self.parse(key)
    }
}
