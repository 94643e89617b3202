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

//! Blocked sort-based index construction.
//!
//! Four phases: per-worker sorted-run generation (streaming, bounded
//! memory), parallel pairwise run merging, hash-sharded emission of the
//! merged postings, and document-store emission. Peak memory is about
//! `workers × block_bytes` regardless of corpus size.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::run_io::{RunReader, RunWriter};
use crate::config::Config;
use crate::corpus::DocumentStream;
use crate::shard::ShardEmitter;
use crate::store::DocStoreWriter;
use crate::types::DocId;

/// Wall-clock breakdown of one build, for logs and the indexing benchmark.
#[derive(Debug, Clone, Default)]
pub struct IndexTimings {
    pub run_generation_ms: f64,
    pub merge_ms: f64,
    pub shard_emission_ms: f64,
    pub doc_store_ms: f64,
    pub total_ms: f64,
    pub num_documents: usize,
    pub num_runs: usize,
}

impl IndexTimings {
    pub fn throughput_docs_per_sec(&self) -> f64 {
        if self.total_ms > 0.0 {
            self.num_documents as f64 * 1000.0 / self.total_ms
        } else {
            0.0
        }
    }
}

pub struct BsbiIndexer<'a> {
    stream: &'a DocumentStream,
    index_dir: PathBuf,
    temp_dir: PathBuf,
    block_bytes: usize,
    num_shards: usize,
    num_workers: usize,
}

impl<'a> BsbiIndexer<'a> {
    pub fn new(stream: &'a DocumentStream, cfg: &Config) -> Self {
        Self {
            stream,
            index_dir: cfg.index_dir.clone(),
            temp_dir: cfg.temp_dir(),
            block_bytes: cfg.block_bytes,
            num_shards: cfg.num_shards,
            num_workers: cfg.effective_workers(),
        }
    }

    /// Run the full build. On failure the temp directory is left in place
    /// for diagnosis; on success it is removed.
    pub fn build(&self) -> Result<IndexTimings> {
        std::fs::create_dir_all(&self.index_dir).context("create index dir")?;
        std::fs::create_dir_all(&self.temp_dir).context("create temp dir")?;

        let mut timings = IndexTimings {
            num_documents: self.stream.len(),
            ..Default::default()
        };
        log::info!(
            "bsbi build: {} documents, {} workers, {} shards, {} MiB block",
            self.stream.len(),
            self.num_workers,
            self.num_shards,
            self.block_bytes / (1024 * 1024)
        );

        let total_start = Instant::now();

        let t = Instant::now();
        let run_files = self.generate_runs()?;
        timings.run_generation_ms = t.elapsed().as_secs_f64() * 1000.0;
        timings.num_runs = run_files.len();
        log::info!(
            "phase 1: {} sorted runs in {:.0} ms",
            run_files.len(),
            timings.run_generation_ms
        );

        let t = Instant::now();
        let final_run = self.merge_runs(run_files)?;
        timings.merge_ms = t.elapsed().as_secs_f64() * 1000.0;
        log::info!("phase 2: merge complete in {:.0} ms", timings.merge_ms);

        let t = Instant::now();
        self.emit_shards(final_run.as_deref())?;
        timings.shard_emission_ms = t.elapsed().as_secs_f64() * 1000.0;
        log::info!(
            "phase 3: {} shards written in {:.0} ms",
            self.num_shards,
            timings.shard_emission_ms
        );

        let t = Instant::now();
        self.write_doc_store()?;
        timings.doc_store_ms = t.elapsed().as_secs_f64() * 1000.0;
        log::info!(
            "phase 4: document store written in {:.0} ms",
            timings.doc_store_ms
        );

        std::fs::remove_dir_all(&self.temp_dir).context("remove temp dir")?;
        timings.total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
        log::info!(
            "bsbi build done in {:.0} ms ({:.0} docs/s)",
            timings.total_ms,
            timings.throughput_docs_per_sec()
        );
        Ok(timings)
    }

    // Phase 1. The doc-id range is split into contiguous chunks, one per
    // worker; each worker streams its documents and spills a sorted run
    // whenever its buffer estimate crosses block_bytes.
    fn generate_runs(&self) -> Result<Vec<PathBuf>> {
        let num_docs = self.stream.len();
        let workers = self.num_workers.max(1);
        let docs_per_worker = (num_docs + workers - 1) / workers;
        let run_files: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

        (0..workers)
            .into_par_iter()
            .try_for_each(|worker_id| -> Result<()> {
                let start = worker_id * docs_per_worker;
                let end = (start + docs_per_worker).min(num_docs);
                if start >= end {
                    return Ok(());
                }

                let mut buffer: Vec<(String, DocId)> = Vec::new();
                let mut buffer_bytes = 0usize;
                let mut block_num = 0usize;

                for doc_idx in start..end {
                    let doc_id = doc_idx as DocId;
                    let content = self
                        .stream
                        .read_document(doc_id)
                        .with_context(|| format!("worker {} reading doc {}", worker_id, doc_id))?;
                    for token in content.split_whitespace() {
                        buffer_bytes += token.len() + 1 + std::mem::size_of::<DocId>();
                        buffer.push((token.to_string(), doc_id));
                    }
                    if buffer_bytes >= self.block_bytes {
                        self.spill_run(worker_id, block_num, &mut buffer, &run_files)?;
                        block_num += 1;
                        buffer_bytes = 0;
                    }
                }
                if !buffer.is_empty() {
                    self.spill_run(worker_id, block_num, &mut buffer, &run_files)?;
                }
                Ok(())
            })?;

        let mut files = run_files.into_inner();
        // Deterministic merge pairing regardless of worker completion order.
        files.sort();
        Ok(files)
    }

    fn spill_run(
        &self,
        worker_id: usize,
        block_num: usize,
        buffer: &mut Vec<(String, DocId)>,
        run_files: &Mutex<Vec<PathBuf>>,
    ) -> Result<()> {
        buffer.sort_unstable();
        let path = self
            .temp_dir
            .join(format!("run_w{}_b{}.dat", worker_id, block_num));
        let mut w = RunWriter::create(&path)?;
        for (term, doc_id) in buffer.iter() {
            w.write_pair(term, *doc_id)?;
        }
        w.finish()?;
        buffer.clear();
        run_files.lock().push(path);
        Ok(())
    }

    // Phase 2. Pairwise two-way merges, all pairs of a pass in parallel,
    // until one run remains. An unpaired odd file carries forward untouched.
    fn merge_runs(&self, mut files: Vec<PathBuf>) -> Result<Option<PathBuf>> {
        let mut pass = 0usize;
        while files.len() > 1 {
            pass += 1;
            log::debug!(
                "merge pass {}: {} files -> {}",
                pass,
                files.len(),
                (files.len() + 1) / 2
            );
            let pairs: Vec<(PathBuf, PathBuf, PathBuf)> = files
                .chunks(2)
                .filter(|c| c.len() == 2)
                .enumerate()
                .map(|(i, c)| {
                    (
                        c[0].clone(),
                        c[1].clone(),
                        self.temp_dir.join(format!("merge_p{}_{}.dat", pass, i)),
                    )
                })
                .collect();

            let mut next: Vec<PathBuf> = pairs
                .into_par_iter()
                .map(|(a, b, out)| -> Result<PathBuf> {
                    merge_two_runs(&a, &b, &out)?;
                    Ok(out)
                })
                .collect::<Result<Vec<_>>>()?;

            if files.len() % 2 == 1 {
                next.push(files.last().unwrap().clone());
            }
            files = next;
        }
        Ok(files.pop())
    }

    // Phase 3. Stream the merged run, fold consecutive equal terms into one
    // posting list (the stream is (term, doc) sorted, so postings arrive
    // ascending), and route each finished list to hash(term) mod N.
    fn emit_shards(&self, final_run: Option<&Path>) -> Result<()> {
        let mut emitter = ShardEmitter::create(&self.index_dir, self.num_shards)?;
        if let Some(path) = final_run {
            let mut reader = RunReader::open(path)?;
            let mut current_term = String::new();
            let mut postings: Vec<DocId> = Vec::new();
            while let Some((term, doc_id)) = reader.next_pair()? {
                if term != current_term && !current_term.is_empty() {
                    emitter.emit(&current_term, &postings)?;
                    postings.clear();
                }
                current_term = term;
                if postings.last() != Some(&doc_id) {
                    postings.push(doc_id);
                }
            }
            if !current_term.is_empty() {
                emitter.emit(&current_term, &postings)?;
            }
        }
        emitter.finish()
    }

    // Phase 4. One record per doc id in each of the three store files, in id
    // order. Documents whose normalized content is empty still get a record
    // so the id space stays dense.
    fn write_doc_store(&self) -> Result<()> {
        let mut writer = DocStoreWriter::create(&self.index_dir)?;
        for doc_idx in 0..self.stream.len() {
            let doc_id = doc_idx as DocId;
            let content = self.stream.read_document(doc_id)?;
            let name = self.stream.doc_name(doc_id).unwrap_or_default();
            writer.append(doc_id, &content, name)?;
        }
        writer.finish()?;
        Ok(())
    }
}

fn merge_two_runs(a: &Path, b: &Path, out: &Path) -> Result<()> {
    let mut ra = RunReader::open(a)?;
    let mut rb = RunReader::open(b)?;
    let mut w = RunWriter::create(out)?;

    let mut pa = ra.next_pair()?;
    let mut pb = rb.next_pair()?;
    loop {
        match (&pa, &pb) {
            (Some(x), Some(y)) => {
                if x <= y {
                    w.write_pair(&x.0, x.1)?;
                    pa = ra.next_pair()?;
                } else {
                    w.write_pair(&y.0, y.1)?;
                    pb = rb.next_pair()?;
                }
            }
            (Some(x), None) => {
                w.write_pair(&x.0, x.1)?;
                pa = ra.next_pair()?;
            }
            (None, Some(y)) => {
                w.write_pair(&y.0, y.1)?;
                pb = rb.next_pair()?;
            }
            (None, None) => break,
        }
    }
    w.finish()
}
