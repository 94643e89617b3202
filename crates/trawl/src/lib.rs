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

//! Two-stage cascade retrieval engine: a sharded on-disk Boolean index for
//! fast candidate selection, followed by optional cross-encoder reranking of
//! the top candidates.

pub mod bench;
pub mod config;
pub mod corpus;
pub mod error;
pub mod eval;
pub mod index;
pub mod normalize;
pub mod pipeline;
pub mod prerank;
pub mod query;
pub mod rerank;
pub mod result_set;
pub mod retrieve;
pub mod shard;
pub mod store;
pub mod synonyms;
pub mod trec;
pub mod types;

// Re-export the handful of types most callers need so downstream binaries can
// use a flat import without chasing module paths.

pub use crate::config::Config;
pub use crate::corpus::DocumentStream;
pub use crate::error::SearchError;
pub use crate::index::BsbiIndexer;
pub use crate::pipeline::SearchPipeline;
pub use crate::query::{parse_query, QueryNode};
pub use crate::rerank::{RerankService, ScoringSession};
pub use crate::result_set::ResultSet;
pub use crate::retrieve::Retriever;
pub use crate::store::DocStore;
pub use crate::types::{DocId, Document, ScoredDocument};

/// Convenience one-shot: build a full on-disk index for `cfg.corpus_dir`
/// under `cfg.index_dir` using the configured worker/shard counts and
/// normalization.
pub fn build_index(cfg: &Config) -> anyhow::Result<index::IndexTimings> {
    let stream = DocumentStream::open_with_normalizer(&cfg.corpus_dir, cfg.normalizer())?;
    BsbiIndexer::new(&stream, cfg).build()
}
