//! Pipeline driver: loads the configuration and sequences the build phases
//! from the raw dump to the nearest-neighbor file. All behaviour lives in
//! the library; this binary is glue, banners and wall-times.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use geodex::article::{
    build_article_types, build_categories, build_coordinates, build_is_a_in, build_located_at,
    build_redirects, build_title_registry, ArticleSet,
};
use geodex::config::Config;
use geodex::dictionary::build_dictionary;
use geodex::index::{IndexKind, InvertedIndex};
use geodex::neighbors::{build_nearest_neighbors, NeighborIndices};
use geodex::vectors::{build_named_location_vectors, build_tf_idf_vectors};
use geodex::Result;

#[derive(Parser)]
#[command(name = "geodex", about = "Wikipedia nearest-neighbor index builder")]
struct Args {
    /// Configuration properties file
    #[arg(short, long, default_value = "geodex.properties")]
    config: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        tracing::error!("pipeline failed: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let cfg = Config::load(&args.config)?;
    let started = Instant::now();

    let coordinates = Arc::new(timed("coordinates", || build_coordinates(&cfg))?);
    let redirects = Arc::new(timed("redirects", || build_redirects(&cfg))?);
    let dictionary = Arc::new(timed("dictionary", || build_dictionary(&cfg))?);
    let tf_idf = timed("tf-idf vectors", || build_tf_idf_vectors(&cfg, &dictionary))?;
    let titles = Arc::new(timed("title registry", || {
        build_title_registry(&cfg, &tf_idf)
    })?);

    let (category_ids, category_registry) = timed("categories", || build_categories(&cfg))?;
    let category_ids = Arc::new(category_ids);
    let category_registry = Arc::new(category_registry);

    let article_types = Arc::new(timed("article types", || {
        build_article_types(&cfg, &category_ids, &category_registry)
    })?);
    let named_locations = timed("named-location vectors", || {
        build_named_location_vectors(&cfg, &titles, &coordinates, &redirects)
    })?;
    let located_at = timed("located-at", || {
        build_located_at(&cfg, &coordinates, &article_types, &redirects)
    })?;
    let is_a_in = timed("is-a-in", || build_is_a_in(&cfg, &coordinates, &redirects))?;

    let articles = timed("article set join", || {
        Ok(ArticleSet::build(
            Arc::clone(&titles),
            tf_idf,
            named_locations,
            &coordinates,
            unwrap_arc(category_ids),
            unwrap_arc(article_types),
            located_at,
            is_a_in,
        ))
    })?;

    let index_specs = [
        (&cfg.paths.index_words, IndexKind::Words, false),
        (&cfg.paths.index_words_coords, IndexKind::Words, true),
        (&cfg.paths.index_categories, IndexKind::Categories, false),
        (&cfg.paths.index_categories_coords, IndexKind::Categories, true),
        (&cfg.paths.index_named_locations, IndexKind::NamedLocations, false),
        (
            &cfg.paths.index_named_locations_coords,
            IndexKind::NamedLocations,
            true,
        ),
    ];
    let mut built = Vec::with_capacity(index_specs.len());
    for (path, kind, with_coordinates) in index_specs {
        built.push(timed("inverted index", || {
            InvertedIndex::build(&cfg, path, &articles, kind, with_coordinates)
        })?);
    }

    let indices = NeighborIndices {
        words: &built[1],
        named_locations: &built[5],
        categories: &built[3],
    };
    timed("nearest neighbors", || {
        build_nearest_neighbors(&cfg, &articles, &indices)
    })?;

    tracing::info!(
        "pipeline complete in {:.1}s",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn timed<T>(name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    tracing::info!("=== {name} ===");
    let started = Instant::now();
    let result = f()?;
    tracing::info!("{name} finished in {:.1}s", started.elapsed().as_secs_f64());
    Ok(result)
}

// The worker closures holding clones have all been joined by the time the
// join phase runs, so the Arcs are unique again.
fn unwrap_arc<T>(arc: Arc<T>) -> T {
    Arc::into_inner(arc).expect("no outstanding references")
}
