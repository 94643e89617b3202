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

//! The query pipeline: normalize, expand and parse the topic, run Boolean
//! retrieval, hydrate the top candidates from the document store, and
//! (optionally) rerank them. No global state; the loaded index and the
//! rerank handle are owned here and passed in explicitly.

use std::time::Instant;

use crate::config::Config;
use crate::error::SearchError;
use crate::normalize::Normalizer;
use crate::query::parse_query;
use crate::rerank::RerankService;
use crate::result_set::ResultSet;
use crate::retrieve::Retriever;
use crate::store::DocStore;
use crate::synonyms::SynonymStore;
use crate::types::{Document, QueryMetrics, ScoredDocument};

pub struct SearchPipeline {
    normalizer: Normalizer,
    synonyms: SynonymStore,
    retriever: Retriever,
    store: DocStore,
    rerank: Option<RerankService>,
    max_rerank_candidates: usize,
}

impl SearchPipeline {
    /// Open an existing index for querying. Boolean-only until a rerank
    /// service is attached.
    pub fn open(cfg: &Config) -> Result<Self, SearchError> {
        let retriever = Retriever::open(&cfg.index_dir, cfg.num_shards)?;
        let store = DocStore::open(&cfg.index_dir)?;
        Ok(Self {
            normalizer: cfg.normalizer(),
            synonyms: SynonymStore::load(&cfg.synonym_path),
            retriever,
            store,
            rerank: None,
            max_rerank_candidates: cfg.max_rerank_candidates,
        })
    }

    pub fn with_rerank(mut self, service: RerankService) -> Self {
        self.rerank = Some(service);
        self
    }

    pub fn store(&self) -> &DocStore {
        &self.store
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Boolean stage only: candidates in ascending id order.
    pub fn search_boolean(&self, topic: &str) -> Result<ResultSet, SearchError> {
        let normalized = self.normalizer.normalize(topic);
        let tree = parse_query(&normalized, &self.synonyms)?;
        self.retriever.execute(&tree)
    }

    /// Full cascade. Returns the ranked list, best first.
    pub fn search(&self, topic: &str) -> Result<Vec<ScoredDocument>, SearchError> {
        self.search_with_metrics("", topic).map(|(r, _)| r)
    }

    /// Boolean stage plus the lexical pre-ranker: candidates ordered by
    /// distinct-term overlap with the raw topic. A CPU-only alternative when
    /// no cross-encoder is attached.
    pub fn search_preranked(&self, topic: &str) -> Result<Vec<ScoredDocument>, SearchError> {
        let candidates = self.search_boolean(topic)?;
        let capped: Vec<u32> = candidates.iter().take(self.max_rerank_candidates).collect();
        let mut hydrated: Vec<Document> = Vec::with_capacity(capped.len());
        for id in capped {
            if let Some(doc) = self.store.get(id)? {
                hydrated.push(doc);
            }
        }
        Ok(crate::prerank::overlap_rank(topic, &hydrated))
    }

    pub fn search_with_metrics(
        &self,
        query_id: &str,
        topic: &str,
    ) -> Result<(Vec<ScoredDocument>, QueryMetrics), SearchError> {
        let mut metrics = QueryMetrics {
            query_id: query_id.to_string(),
            ..Default::default()
        };

        let t = Instant::now();
        let candidates = self.search_boolean(topic)?;
        metrics.retrieval_ms = t.elapsed().as_secs_f64() * 1000.0;
        metrics.num_candidates = candidates.len();

        // Deterministic cap: the first max_rerank_candidates ids in numeric
        // order. This is not a relevance order, just a stable bound on the
        // rerank workload.
        let capped: Vec<u32> = candidates
            .iter()
            .take(self.max_rerank_candidates)
            .collect();

        let Some(rerank) = &self.rerank else {
            // Reranking disabled: uniform score, candidate order.
            return Ok((
                capped
                    .into_iter()
                    .map(|id| ScoredDocument { id, score: 1.0 })
                    .collect(),
                metrics,
            ));
        };

        let mut hydrated: Vec<Document> = Vec::with_capacity(capped.len());
        for id in capped {
            if let Some(doc) = self.store.get(id)? {
                hydrated.push(doc);
            }
        }

        let t = Instant::now();
        let future = rerank.submit(topic, hydrated);
        let ranked = future.wait()?;
        metrics.reranking_ms = t.elapsed().as_secs_f64() * 1000.0;

        Ok((ranked, metrics))
    }
}
