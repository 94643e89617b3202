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

use std::collections::VecDeque;
use std::path::PathBuf;

use trawl::rerank::{RerankConfig, RerankService, ScoringSession, WordPieceEncoder};
use trawl::types::Document;
use trawl::SearchError;

fn test_vocab() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vocab.txt");
    std::fs::write(&path, "[PAD]\n[UNK]\n[CLS]\n[SEP]\nquick\nbrown\nfox\ndog\n").unwrap();
    (dir, path)
}

fn small_config() -> RerankConfig {
    RerankConfig {
        batch_size: 2,
        max_seq_len: 16,
        max_words: 8,
        chunk_size: 2,
    }
}

fn doc(id: u32) -> Document {
    Document {
        id,
        content: "quick brown fox".to_string(),
    }
}

/// Session stub replaying a fixed score sequence, one per encoded row in
/// submission order.
struct ScriptedSession {
    scores: VecDeque<f32>,
}

impl ScoringSession for ScriptedSession {
    fn run(
        &mut self,
        _input_ids: &[i64],
        _attention_mask: &[i64],
        rows: usize,
        _seq_len: usize,
    ) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(rows);
        for _ in 0..rows {
            let s = self.scores.pop_front().ok_or_else(|| {
                anyhow::anyhow!("scripted session ran out of scores")
            })?;
            out.push(vec![s]);
        }
        Ok(out)
    }
}

struct FailOnceSession {
    failed: bool,
}

impl ScoringSession for FailOnceSession {
    fn run(
        &mut self,
        _input_ids: &[i64],
        _attention_mask: &[i64],
        rows: usize,
        _seq_len: usize,
    ) -> anyhow::Result<Vec<Vec<f32>>> {
        if !self.failed {
            self.failed = true;
            anyhow::bail!("device fault");
        }
        Ok(vec![vec![0.5]; rows])
    }
}

fn service_with(session: Box<dyn ScoringSession>) -> (tempfile::TempDir, RerankService) {
    let (dir, vocab) = test_vocab();
    let encoder = WordPieceEncoder::load(&vocab).unwrap();
    (dir, RerankService::with_session(small_config(), encoder, session))
}

#[test]
fn results_sorted_descending_by_score() {
    // score(doc) = -|id - 42| over candidates [10, 42, 100, 43], replayed in
    // submission order; 42 must come back first.
    let candidates = vec![doc(10), doc(42), doc(100), doc(43)];
    let scores: VecDeque<f32> = candidates
        .iter()
        .map(|d| -((d.id as f32) - 42.0).abs())
        .collect();
    let (_dir, service) = service_with(Box::new(ScriptedSession { scores }));

    let ranked = service.submit("quick fox", candidates).wait().unwrap();
    let ids: Vec<u32> = ranked.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![42, 43, 10, 100]);
    assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn empty_candidate_list_resolves_immediately() {
    let (_dir, service) = service_with(Box::new(ScriptedSession {
        scores: VecDeque::new(),
    }));
    let ranked = service.submit("quick", Vec::new()).wait().unwrap();
    assert!(ranked.is_empty());
}

#[test]
fn shutdown_fulfills_every_future() {
    // Plenty of jobs, then drop the service; each future must resolve with
    // either a result or Cancelled. None may hang.
    let scores: VecDeque<f32> = (0..1000).map(|i| i as f32).collect();
    let (_dir, service) = service_with(Box::new(ScriptedSession { scores }));

    let futures: Vec<_> = (0..100)
        .map(|i| service.submit("quick", vec![doc(i), doc(i + 1000)]))
        .collect();
    drop(service);

    let mut completed = 0usize;
    let mut cancelled = 0usize;
    for f in futures {
        match f.wait() {
            Ok(ranked) => {
                assert_eq!(ranked.len(), 2);
                completed += 1;
            }
            Err(SearchError::Cancelled) => cancelled += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }
    assert_eq!(completed + cancelled, 100);
}

#[test]
fn submit_after_shutdown_is_cancelled() {
    // Dropping the service consumes it, so exercise the failed-stop window
    // through a job submitted while the worker drains: the drain itself is
    // covered above; here the promise-drop backstop is what matters.
    let (_dir, service) = service_with(Box::new(ScriptedSession {
        scores: VecDeque::from(vec![1.0]),
    }));
    let f = service.submit("quick", vec![doc(1)]);
    drop(service);
    // Either processed before the stop flag was observed, or cancelled.
    match f.wait() {
        Ok(ranked) => assert_eq!(ranked.len(), 1),
        Err(SearchError::Cancelled) => {}
        Err(other) => panic!("unexpected error: {}", other),
    }
}

#[test]
fn failed_model_load_yields_rerank_unavailable() {
    let service = RerankService::spawn(small_config(), || {
        anyhow::bail!("model file missing")
    });
    let err = service.submit("quick", vec![doc(1)]).wait().unwrap_err();
    match err {
        SearchError::RerankUnavailable(reason) => {
            assert!(reason.contains("model file missing"))
        }
        other => panic!("unexpected error: {}", other),
    }
    // Still answering (not wedged) for later submissions.
    let err = service.submit("quick", vec![doc(2)]).wait().unwrap_err();
    assert!(matches!(err, SearchError::RerankUnavailable(_)));
}

#[test]
fn inference_error_fails_job_but_not_worker() {
    let (_dir, service) = service_with(Box::new(FailOnceSession { failed: false }));

    let err = service.submit("quick", vec![doc(1)]).wait().unwrap_err();
    assert!(matches!(err, SearchError::InferenceError(_)));

    let ranked = service.submit("quick", vec![doc(2)]).wait().unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].id, 2);
}
