//! Redirect target extraction.

use std::sync::LazyLock;

use regex::Regex;

static REDIRECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<redirect\s+title\s*=\s*"(.*?)"\s*/\s*>"#).unwrap());

/// The trimmed redirect target of a redirect page, in free-text form.
pub fn parse_redirect(page: &str) -> Option<String> {
    REDIRECT
        .captures(page)
        .map(|c| c.get(1).unwrap().as_str().trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_target() {
        let page = "<title>Old</title>\n<redirect title=\"New Name\" />\n";
        assert_eq!(parse_redirect(page), Some("New Name".to_owned()));
    }

    #[test]
    fn test_no_redirect() {
        assert_eq!(parse_redirect("<title>Plain</title>"), None);
    }

    #[test]
    fn test_whitespace_tolerated() {
        let page = "<redirect  title = \" Spaced \"/>";
        assert_eq!(parse_redirect(page), Some("Spaced".to_owned()));
    }
}
