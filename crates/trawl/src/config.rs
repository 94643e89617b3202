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

//! Central configuration: file locations, indexing parameters and reranking
//! hyperparameters in one place.

use std::path::PathBuf;

/// Runtime configuration for indexing, retrieval and reranking.
///
/// `Config::default()` gives the stock layout (`index/`, `data/`, `results/`
/// relative to the working directory); [`Config::from_env`] applies the
/// environment overrides on top of it. `num_workers == 0` means "use all
/// available cores".
#[derive(Debug, Clone)]
pub struct Config {
    pub corpus_dir: PathBuf,
    pub index_dir: PathBuf,
    pub results_dir: PathBuf,
    pub synonym_path: PathBuf,
    pub model_path: PathBuf,
    pub vocab_path: PathBuf,

    pub num_shards: usize,
    pub block_bytes: usize,
    pub num_workers: usize,
    /// Snowball-stem tokens at both indexing and query time. Must match the
    /// setting the index was built with.
    pub stemming: bool,

    pub max_rerank_candidates: usize,
    pub max_seq_len: usize,
    pub max_words: usize,
    pub batch_size: usize,
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("data/corpus"),
            index_dir: PathBuf::from("index"),
            results_dir: PathBuf::from("results"),
            synonym_path: PathBuf::from("data/synonyms.txt"),
            model_path: PathBuf::from("models/cross_encoder.onnx"),
            vocab_path: PathBuf::from("models/vocab.txt"),
            num_shards: 64,
            block_bytes: 256 * 1024 * 1024,
            num_workers: 0,
            stemming: false,
            max_rerank_candidates: 1024,
            max_seq_len: 256,
            max_words: 256,
            batch_size: 128,
            chunk_size: 256,
        }
    }
}

impl Config {
    /// Defaults with environment overrides applied. None of the variables are
    /// required; unset ones keep their default.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("CORPUS_DIR") {
            cfg.corpus_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("INDEX_DIR") {
            cfg.index_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("RESULTS_DIR") {
            cfg.results_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("SYNONYM_PATH") {
            cfg.synonym_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("MODEL_PATH") {
            cfg.model_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("VOCAB_PATH") {
            cfg.vocab_path = PathBuf::from(v);
        }
        cfg
    }

    /// Scratch directory used while a build is in flight. Removed on success,
    /// left behind on failure for diagnosis.
    pub fn temp_dir(&self) -> PathBuf {
        self.index_dir.join("temp")
    }

    /// The text normalizer this configuration calls for.
    pub fn normalizer(&self) -> crate::normalize::Normalizer {
        let n = crate::normalize::Normalizer::new();
        if self.stemming {
            n.with_stemming()
        } else {
            n
        }
    }

    /// Worker count with `0` resolved to the rayon thread-pool width.
    pub fn effective_workers(&self) -> usize {
        if self.num_workers == 0 {
            rayon::current_num_threads()
        } else {
            self.num_workers
        }
    }
}
