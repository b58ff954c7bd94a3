//! Inverted indices mapping term / category / named-location ids to posting
//! lists of `(article-id, quantised score)` pairs.
//!
//! Six indices exist: {words, categories, named locations} x {all articles,
//! articles with coordinates}. The physical layout is a flat array indexed
//! by id whose cells are either absent or a contiguous two-column table, so
//! lookup is O(1) and empty ids cost one `None`. Scores are stored as
//! `round(score * 10^6)`; category scores are all 1.0 and therefore
//! quantise to exactly 1_000_000.

pub mod pruner;

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::Mutex;

use crate::article::ArticleSet;
use crate::binio::{self, DiskRecord};
use crate::config::Config;
use crate::error::Result;
use crate::executor::WorkerPool;
use crate::index::pruner::QuickPruner;

/// Fixed-point factor for storing f32 scores as integers.
pub const SCORE_QUANT: f64 = 1_000_000.0;

/// Which per-article id/score source feeds the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// TF-IDF term ids and scores.
    Words,
    /// Category ids, all scored 1.0.
    Categories,
    /// Named-location title ids and scores.
    NamedLocations,
}

/// One inverted index.
pub struct InvertedIndex {
    cells: Vec<Option<Vec<(u32, u32)>>>,
}

impl InvertedIndex {
    /// Builds (or loads) the index of `kind` over the article set,
    /// optionally restricted to articles with coordinates.
    pub fn build(
        cfg: &Config,
        path: &Path,
        articles: &ArticleSet,
        kind: IndexKind,
        with_coordinates_only: bool,
    ) -> Result<InvertedIndex> {
        binio::load_or_build(&format!("inverted index {path:?}"), path, || {
            let working = working_map(articles, kind, with_coordinates_only);
            Ok(InvertedIndex::from_working_map(
                cfg.executor_wait_millis,
                working,
            ))
        })
    }

    // Quantises every posting list and installs it into the id-indexed
    // array. Workers quantise concurrently; the array grows under a mutex
    // with amortised doubling and each finished list lands in one
    // assignment. Trailing absent cells are trimmed at the end.
    fn from_working_map(
        executor_wait_millis: u64,
        working: HashMap<u32, Vec<(u32, f32)>>,
    ) -> InvertedIndex {
        let cells: Arc<Mutex<Vec<Option<Vec<(u32, u32)>>>>> = Arc::new(Mutex::new(Vec::new()));

        let pool = WorkerPool::with_default_workers(executor_wait_millis);
        for (id, list) in working {
            let cells = Arc::clone(&cells);
            pool.execute(move || {
                let quantised: Vec<(u32, u32)> = list
                    .into_iter()
                    .map(|(article_id, score)| {
                        (article_id, (f64::from(score) * SCORE_QUANT).round() as u32)
                    })
                    .collect();

                let mut cells = cells.lock();
                let slot = id as usize;
                if slot >= cells.len() {
                    let grown = (cells.len() * 2).max(slot + 1);
                    cells.resize(grown, None);
                }
                cells[slot] = Some(quantised);
            });
        }
        // Index construction tasks never block; a join failure here would
        // mean a deadlocked worker, which the timeout surfaces loudly.
        pool.join().expect("index construction workers hung");

        let mut cells = Arc::into_inner(cells).expect("workers joined").into_inner();
        while cells.last().is_some_and(Option::is_none) {
            cells.pop();
        }
        InvertedIndex { cells }
    }

    /// The posting list for `id`, when present.
    pub fn postings(&self, id: u32) -> Option<&[(u32, u32)]> {
        self.cells
            .get(id as usize)
            .and_then(|cell| cell.as_deref())
    }

    /// Number of cells (the id space covered, after trailing trim).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Article ids appearing in at least `threshold` of the posting lists
    /// for the given ids. A threshold of 1 is a plain union; higher
    /// thresholds go through the quick pruner. The caller's own article id
    /// is NOT removed here.
    pub fn prune(&self, ids: &[u32], pruner: &mut QuickPruner, threshold: u32) -> Vec<u32> {
        let lists: Vec<&[(u32, u32)]> = ids.iter().filter_map(|&id| self.postings(id)).collect();

        if threshold <= 1 {
            let mut union: Vec<u32> = lists
                .iter()
                .flat_map(|list| list.iter().map(|&(article_id, _)| article_id))
                .collect();
            union.sort_unstable();
            union.dedup();
            return union;
        }

        pruner
            .prune(&lists)
            .into_iter()
            .filter(|&(_, count)| count >= threshold)
            .map(|(article_id, _)| article_id)
            .collect()
    }
}

// Gathers, per key id, the (article-id, score) pairs of every article whose
// source vector contains that id.
fn working_map(
    articles: &ArticleSet,
    kind: IndexKind,
    with_coordinates_only: bool,
) -> HashMap<u32, Vec<(u32, f32)>> {
    let mut working: HashMap<u32, Vec<(u32, f32)>> = HashMap::new();
    for (article_id, article) in articles.iter() {
        if with_coordinates_only && article.coordinates.is_none() {
            continue;
        }
        match kind {
            IndexKind::Words => {
                for (&id, &score) in article.tf_idf.ids.iter().zip(&article.tf_idf.scores) {
                    working.entry(id).or_default().push((article_id, score));
                }
            }
            IndexKind::Categories => {
                for &id in &article.category_ids {
                    working.entry(id).or_default().push((article_id, 1.0));
                }
            }
            IndexKind::NamedLocations => {
                let vector = &article.named_locations;
                for (&id, &score) in vector.ids.iter().zip(&vector.scores) {
                    working.entry(id).or_default().push((article_id, score));
                }
            }
        }
    }
    working
}

/// Layout: `L` (array length); per cell `k` then, when `k > 0`,
/// `k x (article-id, quantised-score)`.
impl DiskRecord for InvertedIndex {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.cells.len() as u32)?;
        for cell in &self.cells {
            match cell {
                None => w.write_u32::<LittleEndian>(0)?,
                Some(list) => {
                    w.write_u32::<LittleEndian>(list.len() as u32)?;
                    for &(article_id, score) in list {
                        w.write_u32::<LittleEndian>(article_id)?;
                        w.write_u32::<LittleEndian>(score)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<InvertedIndex> {
        let len = r.read_u32::<LittleEndian>()?;
        let mut cells = Vec::with_capacity(len as usize);
        for _ in 0..len {
            let k = r.read_u32::<LittleEndian>()?;
            if k == 0 {
                cells.push(None);
                continue;
            }
            let mut list = Vec::with_capacity(k as usize);
            for _ in 0..k {
                let article_id = r.read_u32::<LittleEndian>()?;
                let score = r.read_u32::<LittleEndian>()?;
                list.push((article_id, score));
            }
            cells.push(Some(list));
        }
        Ok(InvertedIndex { cells })
    }
}
