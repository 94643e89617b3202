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

//! Interactive REPL: one query per line, echoes the Boolean candidate count
//! and the top reranked hits. Malformed queries are reported and the loop
//! continues; the process exits 2 if any were seen.

use clap::Parser;
use std::io::BufRead;
use std::process::ExitCode;

use trawl::rerank::{LexicalSession, RerankConfig, RerankService, ScoringSession, WordPieceEncoder};
use trawl::{Config, SearchError, SearchPipeline};

#[derive(Parser, Debug)]
#[command(name = "trawl-search", about = "Interactive Boolean + rerank search")]
struct Args {
    /// Index directory (defaults to INDEX_DIR or index/)
    #[arg(long)]
    index_dir: Option<std::path::PathBuf>,
    /// Number of index shards the index was built with
    #[arg(long)]
    shards: Option<usize>,
    /// Synonym file for query expansion
    #[arg(long)]
    synonyms: Option<std::path::PathBuf>,
    /// Enable the reranking stage
    #[arg(long)]
    rerank: bool,
    /// Order results by lexical term overlap instead (no model needed)
    #[arg(long, conflicts_with = "rerank")]
    prerank: bool,
    /// The index was built with --stemming
    #[arg(long)]
    stemming: bool,
    /// Show at most this many hits per query
    #[arg(long, default_value_t = 10)]
    limit: usize,
    /// Emit NDJSON instead of plain text
    #[arg(long)]
    json: bool,
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
    if let Some(s) = &args.synonyms {
        cfg.synonym_path = s.clone();
    }
    cfg.stemming = args.stemming;

    let mut pipeline = match SearchPipeline::open(&cfg) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(1);
        }
    };
    if args.rerank {
        let vocab_path = cfg.vocab_path.clone();
        let service = RerankService::spawn(RerankConfig::from(&cfg), move || {
            let encoder = WordPieceEncoder::load(&vocab_path)?;
            let session: Box<dyn ScoringSession> = Box::new(LexicalSession::new(encoder.sep_id()));
            Ok((encoder, session))
        });
        pipeline = pipeline.with_rerank(service);
    }

    let stdin = std::io::stdin();
    let mut saw_malformed = false;
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if let Err(e) = run_query(&pipeline, query, &args) {
            match e {
                SearchError::MalformedQuery { .. } => {
                    eprintln!("error: {}", e);
                    saw_malformed = true;
                }
                other => {
                    eprintln!("error: {}", other);
                    if !other.is_recoverable() {
                        return ExitCode::from(1);
                    }
                }
            }
        }
    }

    if saw_malformed {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

fn run_query(pipeline: &SearchPipeline, query: &str, args: &Args) -> Result<(), SearchError> {
    let candidates = pipeline.search_boolean(query)?;
    let ranked = if args.prerank {
        pipeline.search_preranked(query)?
    } else {
        match pipeline.search(query) {
            Ok(r) => r,
            Err(SearchError::RerankUnavailable(reason)) => {
                eprintln!(
                    "warning: reranking unavailable ({}), showing Boolean order",
                    reason
                );
                candidates
                    .iter()
                    .take(args.limit)
                    .map(|id| trawl::ScoredDocument { id, score: 1.0 })
                    .collect()
            }
            Err(e) => return Err(e),
        }
    };

    if args.json {
        for hit in ranked.iter().take(args.limit) {
            let v = serde_json::json!({
                "doc_id": hit.id,
                "doc_name": pipeline.store().name_of(hit.id),
                "score": hit.score,
                "candidates": candidates.len(),
            });
            println!("{}", v);
        }
    } else {
        println!("{} boolean candidates", candidates.len());
        for (rank, hit) in ranked.iter().take(args.limit).enumerate() {
            let name = pipeline.store().name_of(hit.id).unwrap_or("<unnamed>");
            println!("  {:>2}. {} (doc {}, score {:.4})", rank + 1, name, hit.id, hit.score);
        }
    }
    Ok(())
}
