//! The per-article record and the phase builders that produce its fields.
//!
//! Each builder streams the dump once (or loads its previously persisted
//! output), producing one content-addressed map keyed by canonical title.
//! [`ArticleSet::build`] then joins every field into immutable [`Article`]
//! records stored in a flat vector indexed by title id.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::binio;
use crate::config::Config;
use crate::coordinates::Coordinates;
use crate::error::Result;
use crate::extractor::{scan_articles, ExtractOptions};
use crate::parse::article_type::{self, ArticleType};
use crate::parse::categories::parse_categories;
use crate::parse::clean_text::clean_text;
use crate::parse::coords::parse_coordinates;
use crate::parse::is_a_in::parse_is_a_in;
use crate::parse::located_at::{parse_located_at, LocationContext};
use crate::parse::redirect::parse_redirect;
use crate::registry::StringIdRegistry;
use crate::tokenizer::tokenize;
use crate::vectors::ScoresVector;

/// One article with every derived field. Created exactly once per title by
/// the registry join; immutable afterwards.
#[derive(Debug, Clone)]
pub struct Article {
    pub title: String,
    pub coordinates: Option<Coordinates>,
    pub article_type: ArticleType,
    /// Sorted ascending, unique.
    pub category_ids: Vec<u32>,
    /// Term-id TF-IDF vector.
    pub tf_idf: ScoresVector,
    /// Title-id named-location vector.
    pub named_locations: ScoresVector,
    pub located_at: Option<String>,
    pub is_a_in: HashSet<String>,
}

/// All articles, indexed by title id.
pub struct ArticleSet {
    pub titles: Arc<StringIdRegistry>,
    articles: Vec<Article>,
}

impl ArticleSet {
    /// Joins the per-field maps into one record per registered title.
    /// Missing fields degrade to empty defaults; a field keyed by an
    /// unregistered title is dropped (integrity violations never corrupt
    /// the joined set).
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        titles: Arc<StringIdRegistry>,
        mut tf_idf: HashMap<String, ScoresVector>,
        mut named_locations: HashMap<String, ScoresVector>,
        coordinates: &HashMap<String, Coordinates>,
        mut category_ids: HashMap<String, Vec<u32>>,
        mut article_types: HashMap<String, ArticleType>,
        mut located_at: HashMap<String, String>,
        mut is_a_in: HashMap<String, Vec<String>>,
    ) -> ArticleSet {
        let mut articles = Vec::with_capacity(titles.len());
        for (_, title) in titles.iter() {
            articles.push(Article {
                title: title.to_owned(),
                coordinates: coordinates.get(title).copied(),
                article_type: article_types.remove(title).unwrap_or(ArticleType::None),
                category_ids: category_ids.remove(title).unwrap_or_default(),
                tf_idf: tf_idf.remove(title).unwrap_or_default(),
                named_locations: named_locations.remove(title).unwrap_or_default(),
                located_at: located_at.remove(title),
                is_a_in: is_a_in
                    .remove(title)
                    .map(|targets| targets.into_iter().collect())
                    .unwrap_or_default(),
            });
        }
        ArticleSet { titles, articles }
    }

    pub fn get(&self, id: u32) -> Option<&Article> {
        self.articles.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// `(title id, article)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Article)> {
        self.articles
            .iter()
            .enumerate()
            .map(|(i, a)| (i as u32, a))
    }
}

/// Builds (or loads) the title-to-coordinates table.
pub fn build_coordinates(cfg: &Config) -> Result<HashMap<String, Coordinates>> {
    binio::load_or_build("coordinates", &cfg.paths.coordinates, || {
        let map = Arc::new(Mutex::new(HashMap::new()));
        let sink = Arc::clone(&map);
        scan_articles(cfg, ExtractOptions::default(), move |record| {
            if let Some(c) = parse_coordinates(&record.text) {
                sink.lock().insert(record.title, c);
            }
        })?;
        Ok(Arc::into_inner(map).expect("workers joined").into_inner())
    })
}

/// Builds (or loads) the redirect table.
pub fn build_redirects(cfg: &Config) -> Result<HashMap<String, String>> {
    let options = ExtractOptions {
        redirects: true,
        ..Default::default()
    };
    binio::load_or_build("redirects", &cfg.paths.redirects, || {
        let map = Arc::new(Mutex::new(HashMap::new()));
        let sink = Arc::clone(&map);
        scan_articles(cfg, options, move |record| {
            if let Some(target) = parse_redirect(&record.text) {
                sink.lock().insert(record.title, target);
            }
        })?;
        Ok(Arc::into_inner(map).expect("workers joined").into_inner())
    })
}

/// Builds (or loads) the title registry from the TF-IDF vector map, which
/// covers exactly the extracted article universe. Titles are registered in
/// sorted order so a fresh build is deterministic.
pub fn build_title_registry(
    cfg: &Config,
    tf_idf: &HashMap<String, ScoresVector>,
) -> Result<StringIdRegistry> {
    binio::load_or_build("title registry", &cfg.paths.titles, || {
        let mut titles: Vec<String> = tf_idf.keys().cloned().collect();
        titles.sort_unstable();
        Ok(StringIdRegistry::from_strings(0, titles))
    })
}

/// Builds (or loads) the article-to-category-ids map together with the
/// category registry. Category ids are assigned over the sorted set of
/// distinct category names; per-article lists are sorted and de-duplicated
/// at id-assignment time.
pub fn build_categories(cfg: &Config) -> Result<(HashMap<String, Vec<u32>>, StringIdRegistry)> {
    let map_path = &cfg.paths.article_categories;
    let registry_path = &cfg.paths.category_ids;

    if map_path.exists() && registry_path.exists() {
        tracing::info!("categories: loading previously built output");
        return Ok((binio::load(map_path)?, binio::load(registry_path)?));
    }
    // One of the two may survive a partial run; both are rebuilt together.
    let _ = std::fs::remove_file(map_path);
    let _ = std::fs::remove_file(registry_path);

    let names: Arc<Mutex<HashMap<String, Vec<String>>>> = Arc::new(Mutex::new(HashMap::new()));
    let sink = Arc::clone(&names);
    scan_articles(cfg, ExtractOptions::default(), move |record| {
        let categories = parse_categories(&record.text);
        sink.lock().insert(record.title, categories);
    })?;
    let names = Arc::into_inner(names).expect("workers joined").into_inner();

    let mut distinct: Vec<String> = names
        .values()
        .flatten()
        .cloned()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    distinct.sort_unstable();
    let registry = StringIdRegistry::from_strings(0, distinct);

    let map: HashMap<String, Vec<u32>> = names
        .into_iter()
        .map(|(title, categories)| {
            let mut ids: Vec<u32> = categories
                .iter()
                .filter_map(|c| registry.id(c))
                .collect();
            ids.sort_unstable();
            ids.dedup();
            (title, ids)
        })
        .collect();

    binio::save(&map, map_path)?;
    binio::save(&registry, registry_path)?;
    tracing::info!("categories: built and saved");
    Ok((map, registry))
}

/// Builds (or loads) the article-type map.
pub fn build_article_types(
    cfg: &Config,
    categories: &Arc<HashMap<String, Vec<u32>>>,
    category_registry: &Arc<StringIdRegistry>,
) -> Result<HashMap<String, ArticleType>> {
    binio::load_or_build("article types", &cfg.paths.article_types, || {
        let map = Arc::new(Mutex::new(HashMap::new()));
        let sink = Arc::clone(&map);
        let categories = Arc::clone(categories);
        let category_registry = Arc::clone(category_registry);
        scan_articles(cfg, ExtractOptions::default(), move |record| {
            let names: Vec<String> = categories
                .get(&record.title)
                .into_iter()
                .flatten()
                .filter_map(|&id| category_registry.string(id))
                .map(str::to_owned)
                .collect();

            let found = article_type::from_categories(&names)
                .or_else(|| article_type::from_infobox(&record.text))
                .or_else(|| {
                    // Stopwords are kept: the text heuristic needs them.
                    let words = tokenize(&clean_text(&record.title, &record.text), false);
                    article_type::from_text(&words, &names)
                })
                .or_else(|| article_type::ship_title_fallback(&record.title));

            if let Some(article_type) = found {
                sink.lock().insert(record.title, article_type);
            }
        })?;
        Ok(Arc::into_inner(map).expect("workers joined").into_inner())
    })
}

/// Builds (or loads) the explicit "located-at" map.
pub fn build_located_at(
    cfg: &Config,
    coordinates: &Arc<HashMap<String, Coordinates>>,
    article_types: &Arc<HashMap<String, ArticleType>>,
    redirects: &Arc<HashMap<String, String>>,
) -> Result<HashMap<String, String>> {
    let limits = cfg.limits.clone();
    binio::load_or_build("located-at", &cfg.paths.located_at, || {
        let map = Arc::new(Mutex::new(HashMap::new()));
        let sink = Arc::clone(&map);
        let coordinates = Arc::clone(coordinates);
        let article_types = Arc::clone(article_types);
        let redirects = Arc::clone(redirects);
        scan_articles(cfg, ExtractOptions::default(), move |record| {
            let ctx = LocationContext {
                coordinates: &coordinates,
                article_types: &article_types,
                redirects: &redirects,
            };
            if let Some(location) = parse_located_at(&record.title, &record.text, &ctx, &limits) {
                sink.lock().insert(record.title, location);
            }
        })?;
        Ok(Arc::into_inner(map).expect("workers joined").into_inner())
    })
}

/// Builds (or loads) the "is-a-in" map; only articles with a non-empty
/// location set are stored.
pub fn build_is_a_in(
    cfg: &Config,
    coordinates: &Arc<HashMap<String, Coordinates>>,
    redirects: &Arc<HashMap<String, String>>,
) -> Result<HashMap<String, Vec<String>>> {
    let limits = cfg.limits.clone();
    binio::load_or_build("is-a-in", &cfg.paths.is_a_in, || {
        let map = Arc::new(Mutex::new(HashMap::new()));
        let sink = Arc::clone(&map);
        let coordinates = Arc::clone(coordinates);
        let redirects = Arc::clone(redirects);
        scan_articles(cfg, ExtractOptions::default(), move |record| {
            let locations =
                parse_is_a_in(&record.title, &record.text, &coordinates, &redirects, &limits);
            if !locations.is_empty() {
                sink.lock().insert(record.title, locations);
            }
        })?;
        Ok(Arc::into_inner(map).expect("workers joined").into_inner())
    })
}
