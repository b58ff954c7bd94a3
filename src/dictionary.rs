//! The corpus vocabulary: term ids, document frequencies and idf.
//!
//! Built in a single pass over the clean text of every article. Term ids
//! start at 1 and are assigned in arrival order; the per-term document
//! frequency counts containing articles, not occurrences. Construction goes
//! through [`DictionaryBuilder`], whose `finish` produces the immutable
//! [`Dictionary`] the rest of the pipeline shares by reference.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::Mutex;

use crate::binio::{self, DiskRecord};
use crate::registry::StringIdRegistry;

/// Term ids start here; 0 never names a term.
const FIRST_TERM_ID: u32 = 1;

/// The finalised, read-only vocabulary.
#[derive(Debug)]
pub struct Dictionary {
    terms: StringIdRegistry,
    /// Indexed by term id; slot 0 is unused padding.
    df: Vec<u32>,
    total_documents: u32,
    total_words: u64,
}

impl Dictionary {
    pub fn word_to_id(&self, word: &str) -> Option<u32> {
        self.terms.id(word)
    }

    pub fn id_to_word(&self, id: u32) -> Option<&str> {
        self.terms.string(id)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn total_documents(&self) -> u32 {
        self.total_documents
    }

    pub fn total_words(&self) -> u64 {
        self.total_words
    }

    /// `log10(totalDocuments / df)` for a known id; an unknown or absent id
    /// falls back to `log10(totalDocuments)`, the rarest-possible weight.
    pub fn log_idf(&self, id: Option<u32>) -> f64 {
        let total = f64::from(self.total_documents);
        match id.and_then(|id| self.df.get(id as usize)).copied() {
            Some(df) if df > 0 => (total / f64::from(df)).log10(),
            _ => total.log10(),
        }
    }
}

/// Accumulates the vocabulary while articles stream through. All mutation
/// happens under one internal mutex, so workers share the builder freely;
/// the hot token-counting path stays in the caller's thread.
#[derive(Debug, Default)]
pub struct DictionaryBuilder {
    state: Mutex<BuilderState>,
}

#[derive(Debug)]
struct BuilderState {
    terms: StringIdRegistry,
    df: Vec<u32>,
    total_documents: u32,
    total_words: u64,
}

impl Default for BuilderState {
    fn default() -> Self {
        BuilderState {
            terms: StringIdRegistry::new(FIRST_TERM_ID),
            df: vec![0],
            total_documents: 0,
            total_words: 0,
        }
    }
}

impl DictionaryBuilder {
    pub fn new() -> DictionaryBuilder {
        DictionaryBuilder::default()
    }

    /// Folds one article's filtered tokens into the vocabulary. Multiplicity
    /// within the article does not affect document frequencies.
    pub fn add_document(&self, tokens: &[String]) {
        let mut seen = std::collections::HashSet::new();
        let unique: Vec<&String> = tokens.iter().filter(|w| seen.insert(w.as_str())).collect();

        let mut state = self.state.lock();
        state.total_documents += 1;
        state.total_words += tokens.len() as u64;
        for word in unique {
            let id = state.terms.add(word.clone());
            let slot = id as usize;
            if slot >= state.df.len() {
                state.df.resize(slot + 1, 0);
            }
            state.df[slot] += 1;
        }
    }

    /// Finalises into the immutable dictionary.
    pub fn finish(self) -> Dictionary {
        let state = self.state.into_inner();
        Dictionary {
            terms: state.terms,
            df: state.df,
            total_documents: state.total_documents,
            total_words: state.total_words,
        }
    }
}

/// Layout: `totalDocuments`, `totalWords: u64`, `M`, `M x (term, id)`,
/// `D`, `D x (id, df)`.
impl DiskRecord for Dictionary {
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.total_documents)?;
        w.write_u64::<LittleEndian>(self.total_words)?;
        self.terms.write_to(w)?;

        let entries: Vec<(u32, u32)> = self
            .df
            .iter()
            .enumerate()
            .filter(|&(_, &df)| df > 0)
            .map(|(id, &df)| (id as u32, df))
            .collect();
        w.write_u32::<LittleEndian>(entries.len() as u32)?;
        for (id, df) in entries {
            w.write_u32::<LittleEndian>(id)?;
            w.write_u32::<LittleEndian>(df)?;
        }
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Dictionary> {
        let total_documents = r.read_u32::<LittleEndian>()?;
        let total_words = r.read_u64::<LittleEndian>()?;
        let terms = StringIdRegistry::read_from(r)?;

        let mut df = vec![0u32; terms.end_id() as usize];
        let entries = r.read_u32::<LittleEndian>()?;
        for _ in 0..entries {
            let id = r.read_u32::<LittleEndian>()? as usize;
            let count = r.read_u32::<LittleEndian>()?;
            if id >= df.len() {
                df.resize(id + 1, 0);
            }
            df[id] = count;
        }

        Ok(Dictionary {
            terms,
            df,
            total_documents,
            total_words,
        })
    }
}

/// Builds (or loads) the dictionary by streaming the configured dump.
pub fn build_dictionary(cfg: &crate::config::Config) -> crate::Result<Dictionary> {
    use crate::extractor::{scan_articles, ExtractOptions};
    use crate::parse::clean_text::clean_text;
    use crate::tokenizer::{filter_stop_words, tokenize};
    use std::sync::Arc;

    binio::load_or_build("dictionary", &cfg.paths.dictionary, || {
        let builder = Arc::new(DictionaryBuilder::new());
        let worker = Arc::clone(&builder);
        scan_articles(cfg, ExtractOptions::default(), move |record| {
            let text = clean_text(&record.title, &record.text);
            let words = filter_stop_words(tokenize(&text, true));
            worker.add_document(&words);
        })?;
        let builder = Arc::into_inner(builder).expect("workers joined");
        Ok(builder.finish())
    })
}
