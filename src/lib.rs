//! # geodex
//!
//! Offline, read-mostly retrieval index over the English Wikipedia corpus,
//! built for predicting the geographic coordinates of articles. From the raw
//! XML dump the pipeline derives, on disk: a vocabulary with document
//! frequencies, per-article TF-IDF vectors, per-article named-location
//! vectors, per-article category-id sets, six inverted indices, and a
//! per-article nearest-neighbor file with similarity scores.
//!
//! The crate is a batch builder, not a query server: each phase detects an
//! already-present output file and loads it instead of recomputing, so reruns
//! are idempotent and restarts are always from the raw dump.

/// Per-article record and the joined article set.
pub mod article;
/// Length-prefixed binary reads/writes for every persisted structure.
pub mod binio;
/// Typed configuration loaded once from a `key = value` properties file.
pub mod config;
/// Coordinates with haversine distance.
pub mod coordinates;
/// Vocabulary with document frequencies and idf.
pub mod dictionary;
/// Crate-level error type.
pub mod error;
/// Fixed worker pool with a bounded, blocking work queue.
pub mod executor;
/// Streaming extraction of article records from the XML dump.
pub mod extractor;
/// Inverted indices and the quick pruner.
pub mod index;
/// Parallel nearest-neighbor computation.
pub mod neighbors;
/// Field parsers: clean text, coordinates, redirects, categories, entities,
/// article types, "located-at" and "is-a-in" evidence.
pub mod parse;
/// String-to-id registries with disk persistence.
pub mod registry;
/// Sorted-vector cosine and Jaccard similarity.
pub mod similarity;
/// Tokenizer with stopword filtering and Porter stemming.
pub mod tokenizer;
/// Per-article score vectors: TF-IDF and named locations.
pub mod vectors;

pub use error::{Error, Result};
