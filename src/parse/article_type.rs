//! Article types and the heuristics that assign them.
//!
//! The type of an article (settlement, country, ship, person, ...) carries a
//! location priority: how far down the geographic hierarchy the subject sits,
//! with −1 marking non-location articles. Types are decided from the
//! article's categories first, then from a `settlement_type` infobox line,
//! then from the opening sentence of the clean text, and as a last resort
//! from a `...ship)` title suffix.
//!
//! The variant word lists are deliberately conservative: singular forms for
//! narrow spot locations, and no words with common non-location meanings.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::sync::LazyLock;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use regex::Regex;

use crate::binio::{self, DiskRecord};

/// The closed set of article types, ordered from non-locations to the most
/// specific location kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArticleType {
    None,
    Ship,
    Person,
    Land,
    Sea,
    Country,
    State,
    Autonomous,
    Region,
    Nature,
    Settlement,
    Spot,
}

impl ArticleType {
    pub const ALL: [ArticleType; 12] = [
        ArticleType::None,
        ArticleType::Ship,
        ArticleType::Person,
        ArticleType::Land,
        ArticleType::Sea,
        ArticleType::Country,
        ArticleType::State,
        ArticleType::Autonomous,
        ArticleType::Region,
        ArticleType::Nature,
        ArticleType::Settlement,
        ArticleType::Spot,
    ];

    /// Lower values mean broader geographic extent; −1 means "not a
    /// location article".
    pub fn location_priority(self) -> i32 {
        match self {
            ArticleType::None | ArticleType::Ship | ArticleType::Person => -1,
            ArticleType::Land | ArticleType::Sea => 0,
            ArticleType::Country => 1,
            ArticleType::State => 2,
            ArticleType::Autonomous => 3,
            ArticleType::Region | ArticleType::Nature => 4,
            ArticleType::Settlement => 5,
            ArticleType::Spot => 6,
        }
    }

    /// Singular and plural textual variants providing evidence of the type.
    pub fn variants(self) -> &'static [&'static str] {
        match self {
            ArticleType::None | ArticleType::Person => &[],
            ArticleType::Ship => &[
                "ship", "ships", "warship", "warships", "frigate", "frigates", "submarine",
                "submarines", "aircraft carrier", "aircraft carriers", "freighter", "caravel",
                "caravels", "galleon", "galleons", "galley", "galleys", "ironclad", "ironclads",
                "battleship", "battleships", "cruiser", "cruisers", "destroyer", "destroyers",
                "steamship", "steamships", "fleet", "fleets",
            ],
            ArticleType::Land => &["island", "islands", "peninsula", "archipelago", "massif"],
            ArticleType::Sea => &["ocean", "oceans", "sea", "seas"],
            ArticleType::Country => &[
                "country", "countries", "kingdom", "empire", "monarchy", "republic",
            ],
            ArticleType::State => &["state", "states"],
            ArticleType::Autonomous => &[
                "autonomy", "autonomies", "microstate", "microstates", "canton", "cantons",
            ],
            ArticleType::Region => &[
                "region", "regions", "province", "provinces", "area", "areas", "county",
                "counties", "territory", "territories", "sites",
            ],
            ArticleType::Nature => &[
                "lake", "lakes", "swamp", "swamps", "ridge", "ridges", "mountain", "mountains",
                "river", "rivers", "stream", "streams", "affluent", "affluents", "creek",
                "creeks", "hill", "hills", "valley", "valleys", "coral", "corals", "reef",
                "glen", "glens",
            ],
            ArticleType::Settlement => &[
                "city", "cities", "capital", "capitals", "town", "towns", "village", "villages",
                "commune", "communes", "port", "ports", "settlement", "settlements",
                "municipal", "municipality", "colony", "colonies", "hamlet", "hamlets",
                "borough", "boroughs", "suburb", "suburbs", "metropolis", "neighborhood",
                "neighborhoods",
            ],
            ArticleType::Spot => &[
                "house", "museum", "stadium", "statue", "monument", "sculpture", "building",
                "tower", "castle", "farm", "square", "fort", "citadel", "hotel", "motel",
                "memorial", "landmark", "garden", "factory", "university", "college", "theater",
                "theatre", "apartment", "palace", "temple", "cathedral", "mosque", "synagogue",
                "bridge", "fountain", "tomb", "church", "chapel", "campus", "plantation",
                "hospital", "estate", "shipyard", "station", "airport", "cemetery", "graveyard",
                "residence", "mall", "observatory", "street", "avenue", "zoo",
            ],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ArticleType::None => "NONE",
            ArticleType::Ship => "SHIP",
            ArticleType::Person => "PERSON",
            ArticleType::Land => "LAND",
            ArticleType::Sea => "SEA",
            ArticleType::Country => "COUNTRY",
            ArticleType::State => "STATE",
            ArticleType::Autonomous => "AUTONOMOUS",
            ArticleType::Region => "REGION",
            ArticleType::Nature => "NATURE",
            ArticleType::Settlement => "SETTLEMENT",
            ArticleType::Spot => "SPOT",
        }
    }

    pub fn from_name(name: &str) -> Option<ArticleType> {
        ArticleType::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// Words after which an "is a X ..." scan stops.
const MAX_INITIAL_WORDS: usize = 50;
/// Words inspected after the verb in the text heuristic.
const VERB_PROXIMITY: usize = 5;

const VERBS: [&str; 4] = ["is", "are", "was", "were"];
const STOP_AT: [&str; 5] = ["in", "of", "that", "at", "on"];

static BIRTHS_CAT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+s?_births").unwrap());
static DEATHS_CAT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+s?_deaths").unwrap());
static PEOPLE_CAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"People_((from)|(in)|(of))").unwrap());
static SETTLEMENT_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\| *settlement_type *=(.*)").unwrap());

/// Assigns an article type, or `None` when no heuristic fires.
///
/// `clean_words` is the tokenized clean text WITH stopwords kept (the text
/// heuristic needs the function words in place).
pub fn article_type(
    title: &str,
    page: &str,
    clean_words: &[String],
    categories: &[String],
) -> Option<ArticleType> {
    if let Some(t) = from_categories(categories) {
        return Some(t);
    }
    if let Some(t) = from_infobox(page) {
        return Some(t);
    }
    if let Some(t) = from_text(clean_words, categories) {
        return Some(t);
    }
    ship_title_fallback(title)
}

/// Category conventions such as "Cities in France", "Countries of Africa"
/// or "1919 ships" directly reveal the type.
pub fn from_categories(categories: &[String]) -> Option<ArticleType> {
    for article_type in ArticleType::ALL {
        for variant in article_type.variants() {
            // Only plural variants appear in category names.
            if !variant.ends_with('s') {
                continue;
            }
            for cat in categories {
                // Year markings and range dashes prefix many categories.
                let cat = cat
                    .trim_start_matches(|c: char| c.is_ascii_digit() || c == '-' || c == '_')
                    .to_lowercase();
                let cat = cat.trim();
                if cat == *variant {
                    return Some(article_type);
                }
                if cat.starts_with(variant) && (cat.contains("_in_") || cat.contains("_of_")) {
                    return Some(article_type);
                }
            }
        }
    }

    for cat in categories {
        if BIRTHS_CAT.is_match(cat)
            || DEATHS_CAT.is_match(cat)
            || PEOPLE_CAT.is_match(cat)
            || cat.contains("Living_people")
            || cat.ends_with("_alumni")
        {
            return Some(ArticleType::Person);
        }
    }

    None
}

/// A "| settlement_type = [[...]]" infobox line is the strongest settlement
/// signal Wikipedia provides.
pub fn from_infobox(page: &str) -> Option<ArticleType> {
    let line = SETTLEMENT_TYPE.captures(page)?.get(1).unwrap().as_str();
    let mut data = line.trim();
    data = data.strip_prefix("[[").unwrap_or(data);
    data = data.strip_suffix("]]").unwrap_or(data);

    let mut matched: Vec<ArticleType> = Vec::new();
    for part in data.split('|') {
        let part = part.to_lowercase();
        let part = part.trim().strip_prefix("list of ").unwrap_or(part.trim());

        // "state capital" and similar variants all describe settlements.
        if part.contains(" capital") {
            matched.push(ArticleType::Settlement);
            continue;
        }

        for article_type in ArticleType::ALL {
            if article_type
                .variants()
                .iter()
                .any(|v| part.starts_with(v))
            {
                matched.push(article_type);
                break;
            }
        }
    }

    matched.into_iter().max_by_key(|t| t.location_priority())
}

/// The common "X is a city in Y" opening sentence. COUNTRY and STATE need
/// category corroboration since "country club" and "state house" would
/// otherwise misfire. `clean_words` keeps its stopwords.
pub fn from_text(clean_words: &[String], categories: &[String]) -> Option<ArticleType> {
    let words = &clean_words[..clean_words.len().min(MAX_INITIAL_WORDS)];

    let verb_index = words
        .iter()
        .position(|w| VERBS.contains(&w.as_str()))?;

    let end = (verb_index + VERB_PROXIMITY).min(words.len());
    for i in verb_index..end {
        let word = &words[i];
        if STOP_AT.contains(&word.as_str()) {
            return None;
        }
        // A sentence boundary ends the "X is a Y" structure.
        if word.trim().ends_with('.') {
            return None;
        }

        let Some(found) = variant_match(word) else {
            continue;
        };

        // "United States" in the opening would wrongly read as a country.
        if i > 0 && word.as_str() == "states" && words[i - 1] == "united" {
            continue;
        }

        // Prefer a narrower type one word ahead ("island country",
        // "state capital").
        if i + 1 < words.len() {
            if let Some(next) = variant_match(&words[i + 1]) {
                if next.location_priority() > found.location_priority()
                    && corroborated(next, categories)
                {
                    return Some(next);
                }
            }
        }

        if corroborated(found, categories) {
            return Some(found);
        }
    }

    None
}

fn variant_match(word: &str) -> Option<ArticleType> {
    ArticleType::ALL
        .into_iter()
        .find(|t| t.variants().contains(&word))
}

fn corroborated(found: ArticleType, categories: &[String]) -> bool {
    let prefix = match found {
        ArticleType::Country => "countries",
        ArticleType::State => "states",
        _ => return true,
    };
    categories.iter().any(|cat| {
        cat.to_lowercase().starts_with(prefix) && (cat.contains("_in_") || cat.contains("_of_"))
    })
}

/// Titles ending in "ship)" that are not abstract nouns name actual vessels.
pub fn ship_title_fallback(title: &str) -> Option<ArticleType> {
    let lower = title.to_lowercase();
    if lower.ends_with("ship)")
        && !lower.ends_with("scholarship)")
        && !lower.ends_with("fellowship)")
        && !lower.ends_with("ownership)")
        && !lower.ends_with("membership)")
    {
        return Some(ArticleType::Ship);
    }
    None
}

/// Layout: `N`, then `N x (title, type-name)`.
impl DiskRecord for HashMap<String, ArticleType> {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut keys: Vec<&String> = self.keys().collect();
        keys.sort_unstable();
        w.write_u32::<LittleEndian>(self.len() as u32)?;
        for key in keys {
            binio::write_string(w, key)?;
            binio::write_string(w, self[key].name())?;
        }
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let n = r.read_u32::<LittleEndian>()?;
        let mut map = HashMap::with_capacity(n as usize);
        for _ in 0..n {
            let title = binio::read_string(r)?;
            let name = binio::read_string(r)?;
            let article_type = ArticleType::from_name(&name).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown article type '{name}'"),
                )
            })?;
            map.insert(title, article_type);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn cats(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_priorities_ordering() {
        assert_eq!(ArticleType::Person.location_priority(), -1);
        assert!(ArticleType::Spot.location_priority() > ArticleType::Settlement.location_priority());
        assert!(
            ArticleType::Settlement.location_priority() > ArticleType::Country.location_priority()
        );
    }

    #[test]
    fn test_name_roundtrip() {
        for t in ArticleType::ALL {
            assert_eq!(ArticleType::from_name(t.name()), Some(t));
        }
        assert_eq!(ArticleType::from_name("CASTLE"), None);
    }

    #[test]
    fn test_category_plural_with_in() {
        let t = article_type("X", "", &[], &cats(&["Cities_in_France"]));
        assert_eq!(t, Some(ArticleType::Settlement));
    }

    #[test]
    fn test_category_year_prefix_stripped() {
        let t = article_type("X", "", &[], &cats(&["1919_ships"]));
        assert_eq!(t, Some(ArticleType::Ship));
    }

    #[test]
    fn test_person_categories() {
        assert_eq!(
            article_type("X", "", &[], &cats(&["1921_births"])),
            Some(ArticleType::Person)
        );
        assert_eq!(
            article_type("X", "", &[], &cats(&["Living_people"])),
            Some(ArticleType::Person)
        );
        assert_eq!(
            article_type("X", "", &[], &cats(&["Harvard_University_alumni"])),
            Some(ArticleType::Person)
        );
        assert_eq!(
            article_type("X", "", &[], &cats(&["People_from_Boston"])),
            Some(ArticleType::Person)
        );
    }

    #[test]
    fn test_infobox_settlement_type() {
        let page = "| settlement_type = [[City]]\n| other = y";
        assert_eq!(article_type("X", page, &[], &[]), Some(ArticleType::Settlement));
    }

    #[test]
    fn test_infobox_takes_highest_priority_part() {
        let page = "| settlement_type = [[Village|Island village]]\n";
        // "island" is LAND (0), "village" is SETTLEMENT (5): settlement wins.
        assert_eq!(article_type("X", page, &[], &[]), Some(ArticleType::Settlement));
    }

    #[test]
    fn test_text_heuristic_simple() {
        let words = tokenize("Foo is a village near the border", false);
        assert_eq!(article_type("X", "", &words, &[]), Some(ArticleType::Settlement));
    }

    #[test]
    fn test_text_heuristic_stop_word_ends_scan() {
        // "in" arrives before any variant: "house" must not be reached.
        let words = tokenize("Foo is found in a house", false);
        assert_eq!(article_type("X", "", &words, &[]), None);
    }

    #[test]
    fn test_text_country_needs_categories() {
        let words = tokenize("Foo is a country club", false);
        assert_eq!(article_type("X", "", &words, &[]), None);

        let words = tokenize("Foo is a country of note", false);
        assert_eq!(
            article_type("X", "", &words, &cats(&["Countries_in_Europe"])),
            Some(ArticleType::Country)
        );
    }

    #[test]
    fn test_text_prefers_narrower_next_word() {
        let words = tokenize("Foo is an island country", false);
        // country (1) follows island (0) but needs corroboration; without
        // categories the island match stands.
        assert_eq!(article_type("X", "", &words, &[]), Some(ArticleType::Land));
    }

    #[test]
    fn test_ship_title_fallback() {
        assert_eq!(
            article_type("HMS_Foo_(battleship)", "", &[], &[]),
            Some(ArticleType::Ship)
        );
        assert_eq!(article_type("Rhodes_(scholarship)", "", &[], &[]), None);
    }

    #[test]
    fn test_map_roundtrip() {
        let mut map = HashMap::new();
        map.insert("A".to_owned(), ArticleType::Spot);
        map.insert("B".to_owned(), ArticleType::None);
        let mut buf = Vec::new();
        map.write_to(&mut buf).unwrap();
        let back = HashMap::<String, ArticleType>::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(back, map);
    }
}
