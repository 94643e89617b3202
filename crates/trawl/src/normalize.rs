// Copyright 2025 Trawl Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Text normalization applied symmetrically at ingestion and query time.
//! Retrieval correctness depends on both sides seeing identical token
//! streams, so there is exactly one normalizer in the crate.

use fnv::FnvHashSet;
use once_cell::sync::Lazy;
use rust_stemmers::{Algorithm, Stemmer};
use std::path::Path;

// `and`, `or`, `not` are Boolean operators and must never be treated as
// stop words.
static DEFAULT_STOP_WORDS: Lazy<FnvHashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "are", "as", "at", "be", "been", "being", "by", "can", "could", "do", "does",
        "for", "from", "had", "has", "have", "he", "how", "in", "is", "it", "its", "may", "might",
        "of", "on", "should", "that", "the", "these", "this", "those", "to", "was", "what",
        "when", "where", "which", "who", "will", "with", "would",
    ]
    .into_iter()
    .collect()
});

const OPERATORS: [&str; 3] = ["and", "or", "not"];

pub struct Normalizer {
    stop_words: FnvHashSet<String>,
    stemmer: Option<Stemmer>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.iter().map(|s| s.to_string()).collect(),
            stemmer: None,
        }
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable Snowball (English) stemming of plain word tokens. Whatever is
    /// chosen here must be used on BOTH sides: an index built with stemming
    /// only matches queries normalized with stemming.
    pub fn with_stemming(mut self) -> Self {
        self.stemmer = Some(Stemmer::create(Algorithm::English));
        self
    }

    /// Replace the default stop-word set with one loaded from a file, one
    /// word per line, `#` comments allowed. Operator words are dropped even
    /// if listed.
    pub fn with_stop_words_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let mut stop_words = FnvHashSet::default();
        for line in text.lines() {
            let w = line.trim();
            if w.is_empty() || w.starts_with('#') {
                continue;
            }
            let w = w.to_lowercase();
            if !OPERATORS.contains(&w.as_str()) {
                stop_words.insert(w);
            }
        }
        log::info!("loaded {} stop words from file", stop_words.len());
        Ok(Self {
            stop_words,
            stemmer: None,
        })
    }

    /// Lowercase, strip everything outside `[a-z0-9()]`, drop stop words,
    /// re-join with single spaces. Idempotent.
    pub fn normalize(&self, text: &str) -> String {
        let mut cleaned = String::with_capacity(text.len());
        for c in text.chars() {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '(' || c == ')' {
                cleaned.push(c);
            } else {
                cleaned.push(' ');
            }
        }
        let mut out = String::with_capacity(cleaned.len());
        for tok in cleaned.split_whitespace() {
            if self.stop_words.contains(tok) {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            match &self.stemmer {
                Some(stemmer) if !OPERATORS.contains(&tok) => {
                    push_stemmed(&mut out, stemmer, tok)
                }
                _ => out.push_str(tok),
            }
        }
        out
    }

    /// Normalized token stream, for ingestion-side indexing.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.normalize(text)
            .split_whitespace()
            .map(|t| t.to_string())
            .collect()
    }
}

// Stem the word core of a token, leaving any parens glued to it intact so
// query grouping survives normalization.
fn push_stemmed(out: &mut String, stemmer: &Stemmer, tok: &str) {
    let is_paren = |c: char| c == '(' || c == ')';
    let core_start = tok.find(|c| !is_paren(c)).unwrap_or(tok.len());
    let core_end = tok.rfind(|c| !is_paren(c)).map(|i| i + 1).unwrap_or(core_start);
    let (prefix, rest) = tok.split_at(core_start);
    let (core, suffix) = rest.split_at(core_end - core_start);
    if !core.is_empty() && core.bytes().all(|b| b.is_ascii_alphanumeric()) {
        out.push_str(prefix);
        out.push_str(&stemmer.stem(core));
        out.push_str(suffix);
    } else {
        out.push_str(tok);
    }
}
