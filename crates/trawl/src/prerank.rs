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

//! Cheap lexical pre-ranking: order Boolean candidates by how many distinct
//! query terms they contain. A CPU-only middle ground between raw candidate
//! order and the cross-encoder.

use std::collections::HashSet;

use crate::types::{Document, ScoredDocument};

// Query and document sides tokenize identically here: lowercase, strip
// non-alphanumerics, unique terms. Uses the raw query (before stop-word
// removal) so every word the user typed counts toward overlap.
fn unique_terms(text: &str) -> HashSet<String> {
    let mut terms = HashSet::new();
    for raw in text.split_whitespace() {
        let term: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if !term.is_empty() {
            terms.insert(term);
        }
    }
    terms
}

/// Score each candidate by distinct-term overlap with `query`, highest
/// first (ties broken by ascending id).
pub fn overlap_rank(query: &str, candidates: &[Document]) -> Vec<ScoredDocument> {
    let query_terms = unique_terms(query);
    if query_terms.is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<ScoredDocument> = candidates
        .iter()
        .map(|doc| {
            let doc_terms = unique_terms(&doc.content);
            let overlap = query_terms.iter().filter(|t| doc_terms.contains(*t)).count();
            ScoredDocument {
                id: doc.id,
                score: overlap as f32,
            }
        })
        .collect();
    scored.sort_by(|a, b| a.ranking_cmp(b));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: u32, content: &str) -> Document {
        Document {
            id,
            content: content.to_string(),
        }
    }

    #[test]
    fn orders_by_distinct_term_overlap() {
        let docs = vec![
            doc(0, "quick brown fox"),
            doc(1, "quick quick quick"),
            doc(2, "nothing relevant"),
        ];
        let ranked = overlap_rank("Quick Fox!", &docs);
        assert_eq!(ranked.iter().map(|s| s.id).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(ranked[0].score, 2.0);
        // Repeats do not inflate the score.
        assert_eq!(ranked[1].score, 1.0);
        assert_eq!(ranked[2].score, 0.0);
    }

    #[test]
    fn empty_query_yields_nothing() {
        let docs = vec![doc(0, "anything")];
        assert!(overlap_rank("!!!", &docs).is_empty());
    }
}
