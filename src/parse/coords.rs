//! Title-level coordinate extraction from `{{coord ...}}` templates.
//!
//! Only coordinates displayed at the title (`display=title` or `display=it`,
//! possibly preceded by a few other display tokens) count as the article's
//! own coordinates. Candidates commented out in the XML or tagged with a
//! non-Earth globe are rejected. Two numeric shapes are accepted:
//! degree/minute/second runs with N/S and E/W markers, and a plain signed
//! decimal pair. The first well-formed candidate wins.

use std::sync::LazyLock;

use regex::Regex;

use crate::coordinates::Coordinates;
use crate::parse::{prefix_chars, suffix_chars};

/// Window around a candidate in which `&lt;!--` / `--&gt;` marks a comment.
const COMMENT_SCAN_CHARS: usize = 10;

// A coord template with a display attribute whose value list reaches "title"
// or "it" within three tokens.
static OUTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\{\{(Wikidata)? *[Cc]oor.*?display *= *(([a-zA-Z]* *)[,;:./]? *){0,3}(([Ii][Tt])|([Tt][Ii][Tt][Ll][Ee])).*?}}",
    )
    .unwrap()
});

// The pipe-delimited numeric run inside a surviving template. Termination on
// "}" also captures coordinates placed at the template's very end.
static INNER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\| *(((-?\d*(\.\d*)?)|N|n|S|s|W|w|E|e) *[|}] *)+").unwrap());

static ENCODED_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&lt;.*?&gt;").unwrap());

/// Extracts the article's title coordinates, if any.
pub fn parse_coordinates(page: &str) -> Option<Coordinates> {
    for m in OUTER.find_iter(page) {
        if is_commented(page, m.start(), m.end()) {
            continue;
        }

        let line = m.as_str();
        if line.contains("globe") && !line.contains("globe:earth") {
            continue;
        }

        // Encoded tags like "&lt;!--42--&gt;" sometimes sneak into the
        // template; strip them before the numeric scan.
        let line = ENCODED_TAG.replace_all(line, "");

        if let Some(inner) = INNER.find(&line) {
            if let Some(c) = parse_numeric_run(inner.as_str()) {
                return Some(c);
            }
        }
    }
    None
}

// A template wrapped in "&lt;!-- ... --&gt;" within a few characters is a
// commented-out leftover, not a real coordinate.
fn is_commented(page: &str, start: usize, end: usize) -> bool {
    let before = last_chars(prefix_chars(page, start), COMMENT_SCAN_CHARS).to_lowercase();
    let after: String = suffix_chars(page, end)
        .chars()
        .take(COMMENT_SCAN_CHARS)
        .collect::<String>()
        .to_lowercase();
    before.contains("&lt;") && after.contains("&gt;")
}

fn last_chars(s: &str, n: usize) -> &str {
    let start = s
        .char_indices()
        .rev()
        .nth(n.saturating_sub(1))
        .map_or(0, |(i, _)| i);
    &s[start..]
}

fn parse_numeric_run(run: &str) -> Option<Coordinates> {
    // Trim the leading "|" and the trailing "|" or "}".
    let mut chars = run.chars();
    chars.next();
    chars.next_back();
    let parts: Vec<String> = chars
        .as_str()
        .split('|')
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect();

    if parts.iter().any(|p| p == "e" || p == "w") {
        from_degrees_minutes_seconds(&parts)
    } else {
        from_decimal_pair(&parts)
    }
}

// Degree/minute/second notation with N/S and E/W markers; 1 to 3 numeric
// parts on each side, S and W negate.
fn from_degrees_minutes_seconds(parts: &[String]) -> Option<Coordinates> {
    let lat_marker = parts
        .iter()
        .position(|p| p.starts_with('n') || p.starts_with('s'))?;
    let lon_marker = parts[lat_marker + 1..]
        .iter()
        .position(|p| p.starts_with('e') || p.starts_with('w'))
        .map(|i| i + lat_marker + 1)?;

    let lat_parts = &parts[..lat_marker];
    let lon_parts = &parts[lat_marker + 1..lon_marker];
    if lat_parts.is_empty() || lat_parts.len() > 3 || lon_parts.is_empty() || lon_parts.len() > 3 {
        return None;
    }

    let mut latitude = to_decimal(lat_parts)?;
    let mut longitude = to_decimal(lon_parts)?;
    if parts.iter().any(|p| p == "s") {
        latitude = -latitude;
    }
    if parts.iter().any(|p| p == "w") {
        longitude = -longitude;
    }
    Coordinates::new(latitude, longitude)
}

fn to_decimal(parts: &[String]) -> Option<f64> {
    let mut dms = [0f64; 3];
    for (slot, part) in dms.iter_mut().zip(parts) {
        *slot = part.parse().ok()?;
    }
    Some(dms[0] + dms[1] / 60.0 + dms[2] / 3600.0)
}

// A plain signed decimal pair.
fn from_decimal_pair(parts: &[String]) -> Option<Coordinates> {
    if parts.len() != 2 {
        return None;
    }
    let latitude: f64 = parts[0].parse().ok()?;
    let longitude: f64 = parts[1].parse().ok()?;
    Coordinates::new(latitude, longitude)
}
