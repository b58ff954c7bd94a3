//! End-to-end pipeline test over a small synthetic dump: every phase runs
//! from the raw XML to the nearest-neighbor file inside a temp directory,
//! and the persisted outputs are checked for the documented invariants.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt};

use geodex::article::{
    build_article_types, build_categories, build_coordinates, build_is_a_in, build_located_at,
    build_redirects, build_title_registry, ArticleSet,
};
use geodex::config::Config;
use geodex::coordinates::Coordinates;
use geodex::dictionary::build_dictionary;
use geodex::index::{IndexKind, InvertedIndex};
use geodex::neighbors::{build_nearest_neighbors, NeighborIndices};
use geodex::parse::article_type::ArticleType;
use geodex::vectors::{build_named_location_vectors, build_tf_idf_vectors};

fn page(title: &str, body: &str) -> String {
    format!(
        "<page>\n  <title>{title}</title>\n  <text xml:space=\"preserve\">{body}</text>\n</page>\n"
    )
}

fn synthetic_dump() -> String {
    let mut xml = String::from("<mediawiki>\n");

    xml.push_str(&page(
        "Paris",
        "{{Coord|48.8566|N|2.3522|E|display=title}}\n\
         '''Paris''' is the capital city in [[France]], on the river Seine. \
         The city hosts grand museums and a famous tower landmark.\n\
         [[Category:Cities in France]]\n[[Category:Capitals in Europe]]\n",
    ));
    xml.push_str(&page(
        "Lyon",
        "{{coord|45|45|35|N|4|50|32|E|display=inline,title}}\n\
         '''Lyon''' is a large city in [[France]], north of the coast. \
         Unlike [[Paris]] it keeps quieter museums, though [[Paris]] looms large.\n\
         [[Category:Cities in France]]\n",
    ));
    xml.push_str(&page(
        "Berlin",
        "{{Coord|52.52|N|13.405|E|display=title}}\n\
         '''Berlin''' is the capital city in [[Germany]]. Its museums rival any city.\n\
         [[Category:Cities in Germany]]\n[[Category:Capitals in Europe]]\n",
    ));
    xml.push_str(&page(
        "France",
        "{{Coord|46.0|N|2.0|E|display=title}}\n\
         '''France''' is a country of western Europe. Its capital draws visitors.\n\
         [[Category:Countries in Europe]]\n",
    ));
    xml.push_str(&page(
        "Tower",
        "{{Coord|48.8584|N|2.2945|E|display=title}}\n\
         '''Tower''' is a tall building located in [[Paris]] beside the river. \
         Visitors climb the tower for museums views.\n\
         [[Category:Monuments]]\n",
    ));
    xml.push_str(&page(
        "Nowhere",
        "&lt;!-- {{coord|10|0|N|20|0|E|display=title}} --&gt;\n\
         '''Nowhere''' is a phantom place discussed beside [[Paris]] in stories.\n\
         [[Category:Fiction]]\n",
    ));

    // A redirect, a list page and a disambiguation page: the latter two are
    // never extracted, the redirect feeds only the redirect table.
    xml.push_str(
        "<page>\n  <title>City of Light</title>\n  <redirect title=\"Paris\" />\n</page>\n",
    );
    xml.push_str(&page("List of cities", "never extracted"));
    xml.push_str(&page("Mercury (disambiguation)", "never extracted"));

    xml.push_str("</mediawiki>\n");
    xml
}

fn write_properties(dir: &Path) -> std::path::PathBuf {
    let base = dir.display();
    let text = format!(
        "geodex.base_path = {base}/\n\
         geodex.wiki_xml_file = enwiki.xml\n\
         geodex.dictionary.folder = dictionary/\n\
         geodex.dictionary.file_name = dictionary.bin\n\
         geodex.articles.folder = articles/\n\
         geodex.articles.titles_to_ids.file_name = titles_to_ids.bin\n\
         geodex.articles.coordinates.file_name = coordinates.bin\n\
         geodex.articles.redirects.file_name = redirects.bin\n\
         geodex.articles.tf_idf_vectors.file_name = tf_idf_vectors.bin\n\
         geodex.articles.named_location_vectors.file_name = named_location_vectors.bin\n\
         geodex.articles.categories.file_name = article_categories.bin\n\
         geodex.articles.types.file_name = article_types.bin\n\
         geodex.articles.located_at.file_name = located_at.bin\n\
         geodex.articles.is_a_in.file_name = is_a_in.bin\n\
         geodex.categories.folder = categories/\n\
         geodex.categories.ids_file_name = category_ids.bin\n\
         geodex.inverted_index.folder = inverted_index/\n\
         geodex.inverted_index.words.file_name = words.bin\n\
         geodex.inverted_index.words_with_coordinates.file_name = words_coords.bin\n\
         geodex.inverted_index.categories.file_name = categories.bin\n\
         geodex.inverted_index.categories_with_coordinates.file_name = categories_coords.bin\n\
         geodex.inverted_index.named_locations.file_name = named_locations.bin\n\
         geodex.inverted_index.named_locations_with_coordinates.file_name = named_locations_coords.bin\n\
         geodex.nearest_neighbors.folder = nearest_neighbors/\n\
         geodex.nearest_neighbors.file_name = neighbors\n\
         geodex.articles.max_terms_vector_size = 50\n\
         geodex.articles.max_named_locations_per_article = 10\n\
         geodex.articles.max_word_index_for_named_locations = 500\n\
         geodex.articles.is_a_in.max_words_till_verb = 12\n\
         geodex.articles.is_a_in.segment_characters_size = 400\n\
         geodex.articles.located_at.max_words_till_phrase = 40\n\
         geodex.articles.located_at.max_characters_post_phrase = 100\n\
         geodex.articles.located_at.max_entities_diameter = 500.0\n\
         geodex.articles.entities.max_index_for_title_removal = 50\n\
         geodex.articles.entities.max_title_length_for_removal = 80\n\
         geodex.pruner.memory_size = 4096\n\
         geodex.pruner.max_iteration = 1000\n\
         geodex.nearest_neighbors.workers = 2\n\
         geodex.nearest_neighbors.tf_idf_pruning_threshold = 1\n\
         geodex.nearest_neighbors.named_locations_pruning_threshold = 1\n\
         geodex.nearest_neighbors.categories_pruning_threshold = 1\n\
         geodex.nearest_neighbors.min_similarity = 0.01\n\
         geodex.nearest_neighbors.max_neighbors = 10\n\
         geodex.nearest_neighbors.weights = 1/3,1/3,1/3\n\
         geodex.executor.termination_wait_millis = 60000\n",
    );
    let path = dir.join("geodex.properties");
    fs::write(&path, text).unwrap();
    path
}

struct Pipeline {
    articles: ArticleSet,
    coordinates: Arc<HashMap<String, Coordinates>>,
    redirects: Arc<HashMap<String, String>>,
    article_types: HashMap<String, ArticleType>,
    is_a_in: HashMap<String, Vec<String>>,
    located_at: HashMap<String, String>,
}

fn run_pipeline(cfg: &Config) -> Pipeline {
    let coordinates = Arc::new(build_coordinates(cfg).unwrap());
    let redirects = Arc::new(build_redirects(cfg).unwrap());
    let dictionary = Arc::new(build_dictionary(cfg).unwrap());
    let tf_idf = build_tf_idf_vectors(cfg, &dictionary).unwrap();
    let titles = Arc::new(build_title_registry(cfg, &tf_idf).unwrap());

    let (category_ids, category_registry) = build_categories(cfg).unwrap();
    let category_ids = Arc::new(category_ids);
    let category_registry = Arc::new(category_registry);

    let article_types =
        Arc::new(build_article_types(cfg, &category_ids, &category_registry).unwrap());
    let named_locations =
        build_named_location_vectors(cfg, &titles, &coordinates, &redirects).unwrap();
    let located_at = build_located_at(cfg, &coordinates, &article_types, &redirects).unwrap();
    let is_a_in = build_is_a_in(cfg, &coordinates, &redirects).unwrap();

    let article_types = Arc::into_inner(article_types).unwrap();
    let articles = ArticleSet::build(
        Arc::clone(&titles),
        tf_idf,
        named_locations,
        &coordinates,
        Arc::into_inner(category_ids).unwrap(),
        article_types.clone(),
        located_at.clone(),
        is_a_in.clone(),
    );

    let words_coords = InvertedIndex::build(
        cfg,
        &cfg.paths.index_words_coords,
        &articles,
        IndexKind::Words,
        true,
    )
    .unwrap();
    let categories_coords = InvertedIndex::build(
        cfg,
        &cfg.paths.index_categories_coords,
        &articles,
        IndexKind::Categories,
        true,
    )
    .unwrap();
    let named_coords = InvertedIndex::build(
        cfg,
        &cfg.paths.index_named_locations_coords,
        &articles,
        IndexKind::NamedLocations,
        true,
    )
    .unwrap();

    let indices = NeighborIndices {
        words: &words_coords,
        named_locations: &named_coords,
        categories: &categories_coords,
    };
    build_nearest_neighbors(cfg, &articles, &indices).unwrap();

    Pipeline {
        articles,
        coordinates,
        redirects,
        article_types,
        is_a_in,
        located_at,
    }
}

#[test]
fn test_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("enwiki.xml"), synthetic_dump()).unwrap();
    let cfg = Config::load(&write_properties(dir.path())).unwrap();

    let result = run_pipeline(&cfg);

    // Coordinate extraction: decimal form, DMS form, commented rejected.
    let paris = result.coordinates["Paris"];
    assert!((paris.latitude - 48.8566).abs() < 1e-9);
    assert!((paris.longitude - 2.3522).abs() < 1e-9);

    let lyon = result.coordinates["Lyon"];
    assert!((lyon.latitude - (45.0 + 45.0 / 60.0 + 35.0 / 3600.0)).abs() < 1e-9);
    assert!((lyon.longitude - (4.0 + 50.0 / 60.0 + 32.0 / 3600.0)).abs() < 1e-9);

    assert!(!result.coordinates.contains_key("Nowhere"));

    // Redirect table.
    assert_eq!(result.redirects["City_of_Light"], "Paris");

    // The article universe: six extracted pages, list/disambiguation/redirect
    // pages excluded, ids dense from 0.
    assert_eq!(result.articles.len(), 6);
    let titles = &result.articles.titles;
    for name in ["Paris", "Lyon", "Berlin", "France", "Tower", "Nowhere"] {
        assert!(titles.id(name).is_some(), "missing article {name}");
    }

    // Article types from categories and text.
    assert_eq!(result.article_types["Paris"], ArticleType::Settlement);
    assert_eq!(result.article_types["France"], ArticleType::Country);

    // Phrase evidence.
    assert_eq!(result.is_a_in["Paris"], vec!["France"]);
    assert_eq!(result.located_at["Tower"], "Paris");

    // Per-article invariants on the joined set.
    for (_, article) in result.articles.iter() {
        assert!(article.category_ids.windows(2).all(|w| w[0] < w[1]));
        for vector in [&article.tf_idf, &article.named_locations] {
            assert_eq!(vector.ids.len(), vector.scores.len());
            assert!(vector.ids.windows(2).all(|w| w[0] < w[1]));
            if !vector.is_empty() {
                let norm: f64 = vector.scores.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
                assert!((norm - 1.0).abs() <= 1e-6);
            }
        }
    }

    // Lyon mentions Paris twice in prose; Paris has coordinates, so it must
    // appear in Lyon's named-location vector.
    let lyon_article = result
        .articles
        .get(titles.id("Lyon").unwrap())
        .unwrap();
    let paris_id = titles.id("Paris").unwrap();
    assert!(lyon_article.named_locations.ids.contains(&paris_id));

    // Nearest-neighbor records.
    let nn_path = cfg.neighbors_file();
    assert!(nn_path.exists());
    let records = read_neighbor_records(&nn_path);
    assert_eq!(records.len(), 6, "one record per source article");

    let nowhere_id = titles.id("Nowhere").unwrap();
    for (source, neighbors) in &records {
        assert!(neighbors.len() <= 10);
        assert!(neighbors.iter().all(|&(id, _)| id != *source));
        assert!(neighbors.iter().all(|&(id, _)| id != nowhere_id));
        assert!(neighbors.iter().all(|&(_, score)| score >= 0.01));
        assert!(neighbors.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    // Paris and Lyon share a category and prose terms.
    let paris_neighbors = &records[&paris_id];
    assert!(paris_neighbors.iter().any(|&(id, _)| id == titles.id("Lyon").unwrap()));

    // Rerunning loads every phase from disk and leaves outputs identical.
    let nn_bytes = fs::read(&nn_path).unwrap();
    let again = run_pipeline(&cfg);
    assert_eq!(again.articles.len(), result.articles.len());
    assert_eq!(fs::read(&nn_path).unwrap(), nn_bytes);
    assert_eq!(*again.coordinates, *result.coordinates);
}

fn read_neighbor_records(path: &Path) -> HashMap<u32, Vec<(u32, f32)>> {
    let mut r = BufReader::new(File::open(path).unwrap());
    let mut records = HashMap::new();
    loop {
        let source = match r.read_u32::<LittleEndian>() {
            Ok(v) => v,
            Err(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => panic!("bad record: {e}"),
        };
        let k = r.read_u32::<LittleEndian>().unwrap();
        let mut neighbors = Vec::with_capacity(k as usize);
        for _ in 0..k {
            let id = r.read_u32::<LittleEndian>().unwrap();
            let score = r.read_f32::<LittleEndian>().unwrap();
            neighbors.push((id, score));
        }
        records.insert(source, neighbors);
    }
    records
}
