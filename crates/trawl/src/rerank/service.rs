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

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;

use super::promise::{pair, Future, Promise};
use super::session::{logits_to_score, ScoringSession};
use super::wordpiece::WordPieceEncoder;
use crate::config::Config;
use crate::error::SearchError;
use crate::types::{Document, ScoredDocument};

#[derive(Debug, Clone, Copy)]
pub struct RerankConfig {
    pub batch_size: usize,
    pub max_seq_len: usize,
    pub max_words: usize,
    pub chunk_size: usize,
}

impl From<&Config> for RerankConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            batch_size: cfg.batch_size,
            max_seq_len: cfg.max_seq_len,
            max_words: cfg.max_words,
            chunk_size: cfg.chunk_size,
        }
    }
}

struct RerankJob {
    query: String,
    candidates: Vec<Document>,
    promise: Promise<Vec<ScoredDocument>>,
}

struct QueueState {
    jobs: VecDeque<RerankJob>,
    stop: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    cond: Condvar,
}

/// Single-consumer rerank service. Producers enqueue `(query, candidates)`
/// jobs; the one worker thread owns the scoring session and the input
/// buffers, scores jobs in FIFO order and fulfills each job's promise
/// exactly once.
pub struct RerankService {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl RerankService {
    /// Spawn the worker. The loader runs on the worker thread; if it fails,
    /// the worker enters a failed state and answers every job with
    /// `RerankUnavailable` instead of tearing the process down, so
    /// Boolean-only queries remain usable.
    pub fn spawn<F>(cfg: RerankConfig, loader: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<(WordPieceEncoder, Box<dyn ScoringSession>)>
            + Send
            + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                stop: false,
            }),
            cond: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("rerank-worker".into())
            .spawn(move || worker_loop(worker_shared, cfg, loader))
            .expect("spawn rerank worker");
        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Convenience constructor for an already-built encoder and session.
    pub fn with_session(
        cfg: RerankConfig,
        encoder: WordPieceEncoder,
        session: Box<dyn ScoringSession>,
    ) -> Self {
        Self::spawn(cfg, move || Ok((encoder, session)))
    }

    /// Enqueue one job. The returned future is fulfilled exactly once: with
    /// the reranked candidates, with the worker's error, or with
    /// `Cancelled` if the service shuts down first.
    pub fn submit(
        &self,
        query: &str,
        candidates: Vec<Document>,
    ) -> Future<Vec<ScoredDocument>> {
        let (promise, future) = pair();
        {
            let mut state = self.shared.state.lock();
            if state.stop {
                drop(state);
                promise.set(Err(SearchError::Cancelled));
                return future;
            }
            state.jobs.push_back(RerankJob {
                query: query.to_string(),
                candidates,
                promise,
            });
        }
        self.shared.cond.notify_one();
        future
    }
}

impl Drop for RerankService {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.stop = true;
        }
        self.shared.cond.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop<F>(shared: Arc<Shared>, cfg: RerankConfig, loader: F)
where
    F: FnOnce() -> anyhow::Result<(WordPieceEncoder, Box<dyn ScoringSession>)>,
{
    let (encoder, mut session) = match loader() {
        Ok(parts) => parts,
        Err(e) => {
            log::error!("rerank model load failed: {:#}", e);
            failed_loop(&shared, e.to_string());
            return;
        }
    };

    // Input buffers are allocated once and reused for every batch.
    let capacity = cfg.batch_size * cfg.max_seq_len;
    let mut input_ids = vec![0i64; capacity];
    let mut attention_mask = vec![0i64; capacity];

    loop {
        let job = {
            let mut state = shared.state.lock();
            loop {
                if state.stop {
                    // Jobs never dequeued are fulfilled with Cancelled.
                    for job in state.jobs.drain(..) {
                        job.promise.set(Err(SearchError::Cancelled));
                    }
                    return;
                }
                if let Some(job) = state.jobs.pop_front() {
                    break job;
                }
                shared.cond.wait(&mut state);
            }
        };
        run_job(
            job,
            &cfg,
            &encoder,
            session.as_mut(),
            &mut input_ids,
            &mut attention_mask,
        );
    }
}

// Model never loaded: keep draining the queue so futures never hang.
fn failed_loop(shared: &Shared, reason: String) {
    loop {
        let mut state = shared.state.lock();
        if state.stop {
            for job in state.jobs.drain(..) {
                job.promise.set(Err(SearchError::Cancelled));
            }
            return;
        }
        while let Some(job) = state.jobs.pop_front() {
            job.promise
                .set(Err(SearchError::RerankUnavailable(reason.clone())));
        }
        shared.cond.wait(&mut state);
    }
}

fn run_job(
    job: RerankJob,
    cfg: &RerankConfig,
    encoder: &WordPieceEncoder,
    session: &mut dyn ScoringSession,
    input_ids: &mut [i64],
    attention_mask: &mut [i64],
) {
    let RerankJob {
        query,
        candidates,
        promise,
    } = job;
    if candidates.is_empty() {
        promise.set(Ok(Vec::new()));
        return;
    }

    let query_ids = encoder.token_ids(&query);
    let seq_len = cfg.max_seq_len;
    let mut scored: Vec<ScoredDocument> = Vec::with_capacity(candidates.len());

    for chunk in candidates.chunks(cfg.chunk_size.max(1)) {
        for batch in chunk.chunks(cfg.batch_size.max(1)) {
            for (row, doc) in batch.iter().enumerate() {
                let truncated = truncate_words(&doc.content, cfg.max_words);
                encoder.encode_pair(
                    &query_ids,
                    truncated,
                    &mut input_ids[row * seq_len..(row + 1) * seq_len],
                    &mut attention_mask[row * seq_len..(row + 1) * seq_len],
                );
            }
            let rows = batch.len();
            let logits = match session.run(
                &input_ids[..rows * seq_len],
                &attention_mask[..rows * seq_len],
                rows,
                seq_len,
            ) {
                Ok(l) => l,
                Err(e) => {
                    // Per-job failure; the worker stays live for later jobs.
                    promise.set(Err(SearchError::InferenceError(e.to_string())));
                    return;
                }
            };
            if logits.len() != rows {
                promise.set(Err(SearchError::InferenceError(format!(
                    "session returned {} rows for a batch of {}",
                    logits.len(),
                    rows
                ))));
                return;
            }
            for (doc, row) in batch.iter().zip(logits.iter()) {
                scored.push(ScoredDocument {
                    id: doc.id,
                    score: logits_to_score(row),
                });
            }
        }
    }

    scored.sort_by(|a, b| a.ranking_cmp(b));
    promise.set(Ok(scored));
}

// Cut at the Nth whitespace boundary; the transformer window is fixed, so
// anything past it only costs encoding time.
fn truncate_words(text: &str, max_words: usize) -> &str {
    if max_words == 0 {
        return "";
    }
    let mut words = 0usize;
    let mut in_word = false;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            in_word = true;
            words += 1;
            if words > max_words {
                return &text[..i];
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_words_cuts_at_boundary() {
        assert_eq!(truncate_words("a b c d", 2), "a b ");
        assert_eq!(truncate_words("a b", 5), "a b");
        assert_eq!(truncate_words("", 3), "");
        assert_eq!(truncate_words("a b c", 0), "");
    }
}
