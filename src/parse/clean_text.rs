//! Clean prose extraction from a raw article record.
//!
//! Isolates the `<text xml...>` segment and strips wiki markup in passes:
//! link constructs, citation templates, tables, HTML-encoded tags, headings
//! and escape sequences, then lines whose first character marks list/table
//! noise. Finally, anything before the `'''<title>'''` anchor near the start
//! is dropped so disambiguation preambles do not pollute the text.

use std::sync::LazyLock;

use regex::Regex;

/// Nested constructs are unwrapped with this many passes.
const BRACKET_REMOVAL_PASSES: usize = 3;

/// The `'''<title>'''` anchor only trims the prefix when found this close
/// to the start.
const MAX_DISTANCE_FOR_TITLE: usize = 250;

static TEXT_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text xml.*?>(.*?)</text>").unwrap());
// "Clean" doubly square brackets: no nested opening bracket inside.
static SQUARE_BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[\[([^\[]*?)]]").unwrap());
static CITATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{\{[^{]*?}}").unwrap());
static TABLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{[^{]*?}").unwrap());
static ENCODED_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)&lt;.*?&gt;").unwrap());
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"={1,3}.*=").unwrap());
static ESCAPES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(&quot;)|(&amp;)|(nbsp;)|(wikt:)").unwrap());

/// Produces the readable prose of one record, or an empty string when the
/// record carries no `<text>` segment.
pub fn clean_text(title: &str, page: &str) -> String {
    let Some(m) = TEXT_PART.captures(page) else {
        return String::new();
    };

    let mut text = m.get(1).unwrap().as_str().to_owned();
    text = collapse_links(&text);
    for _ in 0..BRACKET_REMOVAL_PASSES {
        text = CITATION.replace_all(&text, "").into_owned();
    }
    for _ in 0..BRACKET_REMOVAL_PASSES {
        text = TABLE.replace_all(&text, "").into_owned();
    }

    text = ENCODED_TAG.replace_all(&text, " ").into_owned();
    text = HEADING.replace_all(&text, " ").into_owned();
    text = ESCAPES.replace_all(&text, " ").into_owned();

    text = drop_noise_lines(&text);
    start_with_title(text, title)
}

// Collapses [[...]] constructs, keeping readable content: file links vanish,
// pipe-delimited links keep their first alternate, with two context overrides
// that would otherwise break spot-location detection downstream.
fn collapse_links(text: &str) -> String {
    let mut text = text.to_owned();
    for _ in 0..BRACKET_REMOVAL_PASSES {
        text = SQUARE_BRACKETS
            .replace_all(&text, |caps: &regex::Captures<'_>| {
                let part = caps.get(1).unwrap().as_str();
                if part.contains("File:") {
                    return String::new();
                }
                if part.contains('|') {
                    let lower = part.to_lowercase();
                    if lower.contains("sculpture") && lower.contains("sculptor") {
                        return "sculptor".to_owned();
                    }
                    if lower.contains("musical theatre") && lower.contains("musical") {
                        return "musical".to_owned();
                    }
                    return part[..part.find('|').unwrap()].to_owned();
                }
                part.to_owned()
            })
            .into_owned();
    }
    text
}

fn drop_noise_lines(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for line in text.lines() {
        if line.starts_with("Category:")
            || line.starts_with('|')
            || line.starts_with('!')
            || line.starts_with('*')
            || line.starts_with('#')
            || line.starts_with("Image:")
        {
            continue;
        }
        result.push_str(line);
        result.push('\n');
    }
    result
}

// Cuts any preamble before the '''<title>''' anchor, provided the anchor sits
// within the first MAX_DISTANCE_FOR_TITLE characters.
fn start_with_title(text: String, title: &str) -> String {
    let mut title = title;
    if let Some(i) = title.find(',') {
        title = &title[..i];
    }
    if let Some(i) = title.find('(') {
        title = &title[..i];
    }
    let title = title.replace('_', " ");
    let title = title.trim();

    let mut index = text.find(&format!("'''{title}"));
    if index.is_none() {
        let dashless = title.replace('-', " ");
        index = text.find(&format!("'''{}", dashless.trim()));
    }

    match index {
        Some(i) if i < MAX_DISTANCE_FOR_TITLE => text[i..].to_owned(),
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!("<title>T</title>\n<text xml:space=\"preserve\">{body}</text>")
    }

    #[test]
    fn test_no_text_segment_yields_empty() {
        assert_eq!(clean_text("T", "<title>T</title>"), "");
    }

    #[test]
    fn test_plain_link_collapsed() {
        let page = wrap("born in [[Vienna]] long ago");
        assert!(clean_text("T", &page).contains("born in Vienna long ago"));
    }

    #[test]
    fn test_piped_link_keeps_first_alternate() {
        let page = wrap("the [[Danube|river Danube]] flows");
        assert!(clean_text("T", &page).contains("the Danube flows"));
    }

    #[test]
    fn test_file_link_dropped() {
        let page = wrap("before [[File:photo.jpg|thumb|caption]] after");
        let text = clean_text("T", &page);
        assert!(text.contains("before  after"));
        assert!(!text.contains("photo"));
    }

    #[test]
    fn test_sculptor_and_musical_overrides() {
        let page = wrap("a [[sculpture (art)|sculptor of note]] piece");
        assert!(clean_text("T", &page).contains("a sculptor piece"));

        let page = wrap("a [[musical theatre|musical]] production");
        assert!(clean_text("T", &page).contains("a musical production"));
    }

    #[test]
    fn test_nested_links_unwrapped() {
        let page = wrap("x [[outer [[inner]] link]] y");
        let text = clean_text("T", &page);
        assert!(!text.contains("[["));
        assert!(!text.contains("]]"));
    }

    #[test]
    fn test_citations_and_tables_removed() {
        let page = wrap("fact{{cite web|url=x}} and {| style=\"x\" |} done");
        let text = clean_text("T", &page);
        assert!(!text.contains("cite web"));
        assert!(!text.contains("style"));
        assert!(text.contains("fact and"));
    }

    #[test]
    fn test_headings_and_tags_removed() {
        let page = wrap("intro\n==History==\nbody &lt;br/&gt; end");
        let text = clean_text("T", &page);
        assert!(!text.contains("History"));
        assert!(!text.contains("br/"));
        assert!(text.contains("body"));
    }

    #[test]
    fn test_noise_lines_dropped() {
        let page = wrap("keep me\n| table row\n* bullet\n# numbered\nCategory:X\nImage:Y\nalso keep");
        let text = clean_text("T", &page);
        assert!(text.contains("keep me"));
        assert!(text.contains("also keep"));
        assert!(!text.contains("table row"));
        assert!(!text.contains("bullet"));
        assert!(!text.contains("numbered"));
    }

    #[test]
    fn test_preamble_trimmed_at_title_anchor() {
        let page = wrap("Not to be confused with other uses. '''Berlin''' is the capital");
        let text = clean_text("Berlin", &page);
        assert!(text.starts_with("'''Berlin'''"));
    }

    #[test]
    fn test_far_title_anchor_keeps_text() {
        let filler = "x".repeat(300);
        let page = wrap(&format!("{filler} '''Berlin''' is the capital"));
        let text = clean_text("Berlin", &page);
        assert!(text.starts_with(&filler[..10]));
    }

    #[test]
    fn test_title_cut_at_comma_and_parenthesis() {
        let page = wrap("'''Springfield''' is a city");
        let text = clean_text("Springfield,_Illinois", &page);
        assert!(text.starts_with("'''Springfield'''"));

        let page = wrap("'''Mercury''' is a planet");
        let text = clean_text("Mercury_(planet)", &page);
        assert!(text.starts_with("'''Mercury'''"));
    }
}
