//! Streaming extraction of article records from the raw Wikipedia XML dump.
//!
//! The extractor walks the dump line by line and yields one record per
//! `<page>`..`</page>` region, filtering out internal namespaces,
//! disambiguation pages, "List of" pages and (unless requested) redirects,
//! by examining the `<title>` line only. Record text keeps its original
//! casing; empty lines and the XML envelope are stripped. The body is never
//! parsed here.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::executor::WorkerPool;
use crate::parse;

/// Processed-record count between progress log lines.
const PROGRESS_CHECKPOINT: u64 = 100_000;

/// Title namespace prefixes that never form article records.
const INVALID_TITLE_MARKERS: [&str; 4] = ["wikipedia:", "file:", "portal:", "template:"];

/// One raw article record: the canonical title and the record text.
#[derive(Debug, Clone)]
pub struct RawArticle {
    /// Canonical title: trimmed, entity-decoded, spaces as underscores.
    pub title: String,
    /// The record's lines, `<title>` and markup included, original casing.
    pub text: String,
}

/// Extraction filters and bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Keep `Category:` pages.
    pub categories: bool,
    /// Yield ONLY redirect pages instead of dropping them.
    pub redirects: bool,
    /// Stop after this many records; 0 means unlimited.
    pub limit: usize,
}

/// Lazy iterator over the records of one dump file.
pub struct ArticleExtractor<R: BufRead> {
    reader: R,
    options: ExtractOptions,
    emitted: usize,
    skipped: u64,
    done: bool,
}

impl ArticleExtractor<BufReader<File>> {
    pub fn open(path: &Path, options: ExtractOptions) -> std::io::Result<Self> {
        Ok(ArticleExtractor::new(
            BufReader::new(File::open(path)?),
            options,
        ))
    }
}

impl<R: BufRead> ArticleExtractor<R> {
    pub fn new(reader: R, options: ExtractOptions) -> Self {
        ArticleExtractor {
            reader,
            options,
            emitted: 0,
            skipped: 0,
            done: false,
        }
    }

    /// Malformed records skipped so far (pages without a parseable title).
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    // Reads one page region. Ok(None) at end of input; Ok(Some(None)) for a
    // filtered or malformed page.
    fn next_page(&mut self) -> std::io::Result<Option<Option<RawArticle>>> {
        let mut text = String::new();
        let mut in_page = false;
        let mut invalid = false;
        let mut redirect = false;
        let mut line = String::new();

        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                // A truncated trailing page is dropped, not yielded.
                return Ok(None);
            }

            if line.contains("<page>") {
                text.clear();
                in_page = true;
                invalid = false;
                redirect = false;
                continue;
            }

            if line.contains("</page>") {
                let keep = if self.options.redirects {
                    redirect
                } else {
                    !invalid
                };
                if !in_page || !keep {
                    return Ok(Some(None));
                }
                let article = parse::title_of(&text).map(|title| RawArticle {
                    title,
                    text: std::mem::take(&mut text),
                });
                if article.is_none() {
                    self.skipped += 1;
                    tracing::debug!("record without a parseable title skipped");
                }
                return Ok(Some(article));
            }

            if line.contains("<title>") {
                let lower = line.to_lowercase();
                let stripped: String = lower.split_whitespace().collect();
                if INVALID_TITLE_MARKERS.iter().any(|m| lower.contains(m))
                    || (lower.contains("category:") && !self.options.categories)
                    || stripped.ends_with("(disambiguation)</title>")
                    || stripped.starts_with("<title>listof")
                {
                    invalid = true;
                }
            }

            if line.contains("<redirect title") {
                redirect = true;
                if !self.options.redirects {
                    invalid = true;
                }
            }

            if invalid || !in_page {
                continue;
            }

            let trimmed = line.trim_end_matches(['\n', '\r']);
            if trimmed.is_empty() {
                continue;
            }
            text.push_str(trimmed);
            text.push('\n');
        }
    }
}

impl<R: BufRead> Iterator for ArticleExtractor<R> {
    type Item = std::io::Result<RawArticle>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.next_page() {
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Ok(Some(None)) => continue,
                Ok(Some(Some(article))) => {
                    self.emitted += 1;
                    if self.options.limit != 0 && self.emitted >= self.options.limit {
                        self.done = true;
                    }
                    return Some(Ok(article));
                }
                Err(e) => {
                    // An I/O failure on the dump is fatal for the phase.
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Streams the configured dump and hands every record to `f` on a worker
/// pool sized to the hardware. The producing thread blocks when the pool's
/// queue is full. Returns the number of records processed.
pub fn scan_articles<F>(cfg: &Config, options: ExtractOptions, f: F) -> Result<u64>
where
    F: Fn(RawArticle) + Send + Sync + 'static,
{
    let pool = WorkerPool::with_default_workers(cfg.executor_wait_millis);
    let f = Arc::new(f);
    let processed = Arc::new(AtomicU64::new(0));

    for record in ArticleExtractor::open(&cfg.wiki_xml, options)? {
        let record = record?;
        let f = Arc::clone(&f);
        let processed = Arc::clone(&processed);
        pool.execute(move || {
            f(record);
            let n = processed.fetch_add(1, Ordering::Relaxed) + 1;
            if n % PROGRESS_CHECKPOINT == 0 {
                tracing::info!("processed {n} records");
            }
        });
    }

    pool.join()?;
    Ok(processed.load(Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(title: &str, body: &str) -> String {
        format!("<page>\n<title>{title}</title>\n<text xml:space=\"preserve\">{body}</text>\n</page>\n")
    }

    fn extract_all(xml: &str, options: ExtractOptions) -> Vec<RawArticle> {
        ArticleExtractor::new(xml.as_bytes(), options)
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn test_yields_articles_in_document_order() {
        let xml = format!("{}{}", page("Alpha", "a"), page("Beta", "b"));
        let records = extract_all(&xml, ExtractOptions::default());
        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_internal_namespaces_dropped() {
        let xml = format!(
            "{}{}{}{}{}",
            page("Wikipedia:About", "x"),
            page("File:Photo.jpg", "x"),
            page("Portal:Science", "x"),
            page("Template:Infobox", "x"),
            page("Kept", "x"),
        );
        let records = extract_all(&xml, ExtractOptions::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Kept");
    }

    #[test]
    fn test_category_pages_need_opt_in() {
        let xml = format!("{}{}", page("Category:Rivers", "x"), page("Nile", "x"));
        assert_eq!(extract_all(&xml, ExtractOptions::default()).len(), 1);

        let with_categories = ExtractOptions {
            categories: true,
            ..Default::default()
        };
        assert_eq!(extract_all(&xml, with_categories).len(), 2);
    }

    #[test]
    fn test_disambiguation_and_lists_dropped() {
        let xml = format!(
            "{}{}{}",
            page("Mercury (disambiguation)", "x"),
            page("List of rivers", "x"),
            page("Mercury", "x"),
        );
        let records = extract_all(&xml, ExtractOptions::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Mercury");
    }

    #[test]
    fn test_redirect_modes() {
        let redirect_page =
            "<page>\n<title>Old name</title>\n<redirect title=\"New name\"/>\n</page>\n";
        let xml = format!("{}{}", redirect_page, page("New name", "x"));

        let normal = extract_all(&xml, ExtractOptions::default());
        assert_eq!(normal.len(), 1);
        assert_eq!(normal[0].title, "New_name");

        let redirects_only = ExtractOptions {
            redirects: true,
            ..Default::default()
        };
        let redirects = extract_all(&xml, redirects_only);
        assert_eq!(redirects.len(), 1);
        assert_eq!(redirects[0].title, "Old_name");
    }

    #[test]
    fn test_limit_stops_extraction() {
        let xml: String = (0..10).map(|i| page(&format!("T{i}"), "x")).collect();
        let limited = ExtractOptions {
            limit: 3,
            ..Default::default()
        };
        assert_eq!(extract_all(&xml, limited).len(), 3);
    }

    #[test]
    fn test_empty_lines_and_envelope_stripped() {
        let xml = format!(
            "<mediawiki>\n<siteinfo>stuff</siteinfo>\n{}\n</mediawiki>\n",
            page("Solo", "body text\n\nmore")
        );
        let records = extract_all(&xml, ExtractOptions::default());
        assert_eq!(records.len(), 1);
        assert!(!records[0].text.contains("siteinfo"));
        assert!(!records[0].text.contains("\n\n"));
    }

    #[test]
    fn test_truncated_trailing_page_dropped() {
        let xml = format!("{}<page>\n<title>Cut</title>\ntext without end", page("Whole", "x"));
        let records = extract_all(&xml, ExtractOptions::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Whole");
    }

    #[test]
    fn test_titleless_page_counted_as_skipped() {
        let xml = format!("<page>\nno title here\n</page>\n{}", page("Fine", "x"));
        let mut extractor = ArticleExtractor::new(xml.as_bytes(), ExtractOptions::default());
        let records: Vec<RawArticle> = extractor.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(extractor.skipped(), 1);
    }

    #[test]
    fn test_title_keeps_original_casing_in_text() {
        let xml = page("CamelCase Title", "Body Keeps CASE");
        let records = extract_all(&xml, ExtractOptions::default());
        assert_eq!(records[0].title, "CamelCase_Title");
        assert!(records[0].text.contains("Body Keeps CASE"));
    }
}
