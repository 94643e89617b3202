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

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Dense, 0-based document identifier assigned at corpus enumeration time.
pub type DocId = u32;

/// A document as stored: the id plus the normalized content bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub content: String,
}

/// A document with its cross-encoder (or uniform fallback) relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub id: DocId,
    pub score: f32,
}

impl ScoredDocument {
    /// Descending-score, ascending-id ordering used for final rankings.
    pub fn ranking_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then(self.id.cmp(&other.id))
    }
}

/// One hit in a final result list, as surfaced to callers and the REPL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub doc_id: DocId,
    pub doc_name: Option<String>,
    pub score: f32,
}

/// Per-query timing and size measurements collected by the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryMetrics {
    pub query_id: String,
    pub num_candidates: usize,
    pub retrieval_ms: f64,
    pub reranking_ms: f64,
}

impl QueryMetrics {
    pub fn total_ms(&self) -> f64 {
        self.retrieval_ms + self.reranking_ms
    }
}
