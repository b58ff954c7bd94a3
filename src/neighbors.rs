//! Parallel nearest-neighbor computation over the article set.
//!
//! For every article, candidate neighbors are generated from the
//! with-coordinates inverted indices through the quick pruner (one per
//! worker), scored with the weighted similarity kernel, filtered by the
//! minimal similarity, and the top results appended to the output file.
//! Records are written in completion order, so the file is NOT sorted by
//! source id; consumers index by the embedded id.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use byteorder::{LittleEndian, WriteBytesExt};
use ordered_float::OrderedFloat;
use parking_lot::Mutex;

use crate::article::ArticleSet;
use crate::config::Config;
use crate::error::Result;
use crate::index::pruner::QuickPruner;
use crate::index::InvertedIndex;
use crate::similarity;

/// Processed-article count between progress log lines.
const PROGRESS_CHECKPOINT: u64 = 1000;

/// The three with-coordinates indices the engine consults.
pub struct NeighborIndices<'a> {
    pub words: &'a InvertedIndex,
    pub named_locations: &'a InvertedIndex,
    pub categories: &'a InvertedIndex,
}

/// Computes the nearest-neighbor file for every article. Skips the whole
/// phase when the output (whose name embeds the weights) already exists.
pub fn build_nearest_neighbors(
    cfg: &Config,
    articles: &ArticleSet,
    indices: &NeighborIndices<'_>,
) -> Result<()> {
    let path = cfg.neighbors_file();
    if path.exists() {
        tracing::info!("nearest neighbors: output {path:?} already exists, skipping");
        return Ok(());
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    // The file name embeds the weights and thus contains dots; append the
    // temp suffix rather than replacing a perceived extension.
    let mut tmp = path.clone().into_os_string();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);
    let writer = Mutex::new(BufWriter::new(File::create(&tmp)?));

    let workers = cfg.neighbors.workers.max(1);
    let chunk_size = articles.len().div_ceil(workers);
    let processed = AtomicU64::new(0);
    let failure: Mutex<Option<std::io::Error>> = Mutex::new(None);

    tracing::info!(
        "nearest neighbors: {} articles across {workers} workers",
        articles.len()
    );

    thread::scope(|scope| {
        for worker in 0..workers {
            let start = worker * chunk_size;
            let end = ((worker + 1) * chunk_size).min(articles.len());
            let writer = &writer;
            let failure = &failure;
            let processed = &processed;
            scope.spawn(move || {
                let mut pruner = QuickPruner::new(cfg.pruner);
                for source_id in start as u32..end as u32 {
                    if failure.lock().is_some() {
                        return;
                    }
                    let neighbors = nearest_for(cfg, articles, indices, &mut pruner, source_id);
                    if let Err(e) = write_record(writer, source_id, &neighbors) {
                        *failure.lock() = Some(e);
                        return;
                    }
                    let n = processed.fetch_add(1, Ordering::Relaxed) + 1;
                    if n % PROGRESS_CHECKPOINT == 0 {
                        tracing::info!("nearest neighbors: {n} articles done");
                    }
                }
            });
        }
    });

    if let Some(e) = failure.into_inner() {
        return Err(e.into());
    }
    writer.into_inner().flush()?;
    fs::rename(&tmp, &path)?;
    tracing::info!("nearest neighbors: saved to {path:?}");
    Ok(())
}

/// Candidate generation, scoring and top-k selection for one source article.
pub fn nearest_for(
    cfg: &Config,
    articles: &ArticleSet,
    indices: &NeighborIndices<'_>,
    pruner: &mut QuickPruner,
    source_id: u32,
) -> Vec<(u32, f32)> {
    let Some(source) = articles.get(source_id) else {
        return Vec::new();
    };
    let nn = &cfg.neighbors;
    let weights = &nn.weights;

    // Only components that participate in scoring generate candidates.
    let mut candidates: Vec<u32> = Vec::new();
    if weights.tf_idf > 0.0 {
        candidates.extend(indices.words.prune(
            &source.tf_idf.ids,
            pruner,
            nn.tf_idf_threshold,
        ));
    }
    if weights.named_locations > 0.0 {
        candidates.extend(indices.named_locations.prune(
            &source.named_locations.ids,
            pruner,
            nn.named_locations_threshold,
        ));
    }
    if weights.categories > 0.0 {
        candidates.extend(indices.categories.prune(
            &source.category_ids,
            pruner,
            nn.categories_threshold,
        ));
    }
    candidates.sort_unstable();
    candidates.dedup();

    let mut scored: Vec<(u32, f32)> = Vec::new();
    for candidate_id in candidates {
        // Self-hits are filtered defensively even though pruning includes
        // the source's own posting entries.
        if candidate_id == source_id {
            continue;
        }
        let Some(candidate) = articles.get(candidate_id) else {
            continue;
        };
        if candidate.coordinates.is_none() {
            continue;
        }
        let score = similarity::combined(source, candidate, weights) as f32;
        if score >= nn.min_similarity {
            scored.push((candidate_id, score));
        }
    }

    scored.sort_by_key(|&(_, score)| std::cmp::Reverse(OrderedFloat(score)));
    scored.truncate(nn.max_neighbors);
    scored
}

// Record layout: `source-id`, `k`, `k x (neighbor-id, score: f32)`.
fn write_record(
    writer: &Mutex<BufWriter<File>>,
    source_id: u32,
    neighbors: &[(u32, f32)],
) -> std::io::Result<()> {
    let mut w = writer.lock();
    w.write_u32::<LittleEndian>(source_id)?;
    w.write_u32::<LittleEndian>(neighbors.len() as u32)?;
    for &(neighbor_id, score) in neighbors {
        w.write_u32::<LittleEndian>(neighbor_id)?;
        w.write_f32::<LittleEndian>(score)?;
    }
    Ok(())
}
