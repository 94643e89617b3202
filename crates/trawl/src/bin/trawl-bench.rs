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

//! Topic benchmark: load an existing index, run every topic through the
//! pipeline, evaluate against qrels, and append one row to
//! `results/all_benchmarks.csv`.

use clap::Parser;
use std::process::ExitCode;
use std::time::Instant;

use trawl::bench::{append_record, BenchmarkRecord};
use trawl::rerank::{LexicalSession, RerankConfig, RerankService, ScoringSession, WordPieceEncoder};
use trawl::types::QueryMetrics;
use trawl::{eval, trec, Config, SearchPipeline};

#[derive(Parser, Debug)]
#[command(name = "trawl-bench", about = "Run all topics and record benchmark metrics")]
struct Args {
    /// TREC topics file
    #[arg(long)]
    topics: std::path::PathBuf,
    /// TREC qrels file
    #[arg(long)]
    qrels: std::path::PathBuf,
    /// Index directory (defaults to INDEX_DIR or index/)
    #[arg(long)]
    index_dir: Option<std::path::PathBuf>,
    /// Number of index shards the index was built with
    #[arg(long)]
    shards: Option<usize>,
    /// CPU workers used for the thread pool
    #[arg(long)]
    cpu_workers: Option<usize>,
    /// Enable the reranking stage
    #[arg(long)]
    rerank: bool,
    /// The index was built with --stemming
    #[arg(long)]
    stemming: bool,
    /// Label for the CSV row
    #[arg(long, default_value = "benchmark")]
    label: String,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut cfg = Config::from_env();
    if let Some(d) = &args.index_dir {
        cfg.index_dir = d.clone();
    }
    if let Some(n) = args.shards {
        cfg.num_shards = n;
    }
    if let Some(w) = args.cpu_workers {
        cfg.num_workers = w;
    }
    cfg.stemming = args.stemming;
    if cfg.num_workers > 0 {
        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(cfg.num_workers)
            .build_global();
    }

    match run(&cfg, &args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cfg: &Config, args: &Args) -> anyhow::Result<()> {
    let mut pipeline = SearchPipeline::open(cfg).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    if args.rerank {
        let vocab_path = cfg.vocab_path.clone();
        let service = RerankService::spawn(RerankConfig::from(cfg), move || {
            let encoder = WordPieceEncoder::load(&vocab_path)?;
            let session: Box<dyn ScoringSession> = Box::new(LexicalSession::new(encoder.sep_id()));
            Ok((encoder, session))
        });
        pipeline = pipeline.with_rerank(service);
    }

    let topics = trec::load_topics(&args.topics)?;
    let qrels = trec::load_qrels(&args.qrels, pipeline.store())?;

    let mut rankings: Vec<(String, Vec<u32>)> = Vec::with_capacity(topics.len());
    let mut metrics: Vec<QueryMetrics> = Vec::with_capacity(topics.len());
    let started = Instant::now();
    for (qid, title) in &topics {
        match pipeline.search_with_metrics(qid, title) {
            Ok((ranked, m)) => {
                rankings.push((qid.clone(), ranked.into_iter().map(|s| s.id).collect()));
                metrics.push(m);
            }
            Err(e) => {
                log::warn!("query {} failed: {}", qid, e);
                rankings.push((qid.clone(), Vec::new()));
                metrics.push(QueryMetrics {
                    query_id: qid.clone(),
                    ..Default::default()
                });
            }
        }
    }
    let total_ms = started.elapsed().as_secs_f64() * 1000.0;

    let effectiveness = eval::evaluate(
        rankings.iter().map(|(q, r)| (q.as_str(), r.as_slice())),
        &qrels,
    );
    let record = BenchmarkRecord::from_metrics(
        &args.label,
        cfg.effective_workers(),
        args.rerank,
        total_ms,
        effectiveness,
        &metrics,
    );
    println!(
        "{} queries in {:.0} ms ({:.1} qps), P@10 {:.4}, MAP {:.4}, MRR {:.4}, NDCG@10 {:.4}",
        metrics.len(),
        total_ms,
        record.throughput_qps(),
        effectiveness.precision_at_10,
        effectiveness.map,
        effectiveness.mrr,
        effectiveness.ndcg_at_10,
    );
    append_record(&cfg.results_dir, &record)?;
    Ok(())
}
