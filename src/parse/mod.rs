//! Field parsers over raw article records.
//!
//! Every parser is side-effect free: it reads the record text and produces a
//! typed value. Malformed input never fails a parser; it yields an absent or
//! empty result and the record moves on.

use std::sync::LazyLock;

use regex::Regex;

pub mod article_type;
pub mod categories;
pub mod clean_text;
pub mod coords;
pub mod entities;
pub mod is_a_in;
pub mod located_at;
pub mod redirect;

static TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"< *title *>(.*?)< */ *title").unwrap());

/// Extracts the canonical title from a record's `<title>` line.
pub fn title_of(text: &str) -> Option<String> {
    TITLE
        .captures(text)
        .map(|c| wiki_title(c.get(1).unwrap().as_str().trim()))
}

/// Normalizes free text to canonical wiki-title form: spaces become
/// underscores and the standard HTML entities are decoded.
pub fn wiki_title(free_text: &str) -> String {
    free_text
        .replace(' ', "_")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// First byte offset of an ASCII-case-insensitive occurrence of `needle`.
/// Offsets refer to `haystack` itself, so slicing with them is safe for any
/// ASCII needle.
pub(crate) fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// `&s[..at]` clamped down to the nearest char boundary.
pub(crate) fn prefix_chars(s: &str, at: usize) -> &str {
    let mut at = at.min(s.len());
    while !s.is_char_boundary(at) {
        at -= 1;
    }
    &s[..at]
}

/// `&s[from..]` clamped up to the nearest char boundary.
pub(crate) fn suffix_chars(s: &str, from: usize) -> &str {
    let mut from = from.min(s.len());
    while !s.is_char_boundary(from) {
        from += 1;
    }
    &s[from..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_of() {
        let text = "<page>\n<title> Ulan Bator </title>\n<text>x</text>\n";
        assert_eq!(title_of(text), Some("Ulan_Bator".to_owned()));
        assert_eq!(title_of("<text>no title</text>"), None);
    }

    #[test]
    fn test_wiki_title_decodes_entities() {
        assert_eq!(wiki_title("AT&amp;T Building"), "AT&T_Building");
        assert_eq!(wiki_title("&quot;Hope&quot; Statue"), "\"Hope\"_Statue");
    }

    #[test]
    fn test_find_ignore_ascii_case() {
        assert_eq!(find_ignore_ascii_case("The Located IN part", "located in "), Some(4));
        assert_eq!(find_ignore_ascii_case("nothing here", "located in "), None);
    }

    #[test]
    fn test_char_safe_slicing() {
        let s = "über"; // 'ü' is two bytes
        assert_eq!(prefix_chars(s, 1), "");
        assert_eq!(prefix_chars(s, 2), "ü");
        assert_eq!(suffix_chars(s, 1), "ber");
        assert_eq!(prefix_chars(s, 100), s);
    }
}
