//! Category link extraction.

use std::sync::LazyLock;

use regex::Regex;

// A category link ends at "]]" or at a delimiting "|"; the fragment after a
// "#" is never part of the category name.
static CATEGORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[[Cc]ategory *: *(.*?)(\||]])").unwrap());

/// All category names of one record, normalized to wiki-title form, in
/// source order with duplicates preserved. De-duplication happens when
/// category ids are assigned.
pub fn parse_categories(page: &str) -> Vec<String> {
    CATEGORY
        .captures_iter(page)
        .map(|c| {
            let mut name = c.get(1).unwrap().as_str().replace(' ', "_");
            if let Some(i) = name.find('#') {
                name.truncate(i);
            }
            name
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_categories() {
        let page = "[[Category:Cities in France]]\n[[Category:Capitals in Europe]]";
        assert_eq!(
            parse_categories(page),
            vec!["Cities_in_France", "Capitals_in_Europe"]
        );
    }

    #[test]
    fn test_sort_key_stripped() {
        let page = "[[Category:Rivers|Nile]]";
        assert_eq!(parse_categories(page), vec!["Rivers"]);
    }

    #[test]
    fn test_fragment_stripped() {
        let page = "[[Category:Lakes#Large]]";
        assert_eq!(parse_categories(page), vec!["Lakes"]);
    }

    #[test]
    fn test_duplicates_and_order_preserved() {
        let page = "[[Category:B]] [[category:A]] [[Category:B]]";
        assert_eq!(parse_categories(page), vec!["B", "A", "B"]);
    }

    #[test]
    fn test_no_categories() {
        assert!(parse_categories("plain text [[Link]]").is_empty());
    }
}
