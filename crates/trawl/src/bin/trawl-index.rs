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

use clap::Parser;
use std::io::Write;
use std::process::ExitCode;

use trawl::{Config, DocumentStream};

#[derive(Parser, Debug)]
#[command(name = "trawl-index", about = "Build the sharded on-disk index for a corpus")]
struct Args {
    /// Corpus directory (defaults to CORPUS_DIR or data/corpus)
    corpus: Option<std::path::PathBuf>,
    /// Index output directory (defaults to INDEX_DIR or index/)
    #[arg(long)]
    index_dir: Option<std::path::PathBuf>,
    /// Number of index shards
    #[arg(long)]
    shards: Option<usize>,
    /// CPU workers for run generation (0 = all cores)
    #[arg(long)]
    cpu_workers: Option<usize>,
    /// Per-worker block size in MiB before a sorted run is spilled
    #[arg(long)]
    block_size: Option<usize>,
    /// Stem tokens while indexing (queries must then stem too)
    #[arg(long)]
    stemming: bool,
    /// Record the phase timings as a CSV row under the results directory
    #[arg(long)]
    benchmark: bool,
    /// Label for the benchmark CSV row
    #[arg(long, default_value = "indexing")]
    label: String,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut cfg = Config::from_env();
    if let Some(c) = args.corpus {
        cfg.corpus_dir = c;
    }
    if let Some(d) = args.index_dir {
        cfg.index_dir = d;
    }
    if let Some(n) = args.shards {
        cfg.num_shards = n;
    }
    if let Some(w) = args.cpu_workers {
        cfg.num_workers = w;
    }
    if let Some(mb) = args.block_size {
        cfg.block_bytes = mb * 1024 * 1024;
    }
    cfg.stemming = args.stemming;
    if cfg.num_workers > 0 {
        // Size the shared pool once so worker counts in the CSV mean what
        // they say.
        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(cfg.num_workers)
            .build_global();
    }

    let stream = match DocumentStream::open_with_normalizer(&cfg.corpus_dir, cfg.normalizer()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::from(1);
        }
    };

    let timings = match trawl::BsbiIndexer::new(&stream, &cfg).build() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {:#}", e);
            eprintln!(
                "temp directory {} left in place for diagnosis",
                cfg.temp_dir().display()
            );
            return ExitCode::from(1);
        }
    };

    println!(
        "indexed {} documents into {} shards in {:.0} ms ({:.0} docs/s)",
        timings.num_documents,
        cfg.num_shards,
        timings.total_ms,
        timings.throughput_docs_per_sec()
    );

    if args.benchmark {
        if let Err(e) = append_indexing_csv(&cfg, &args.label, &timings) {
            eprintln!("error: could not write benchmark CSV: {:#}", e);
            return ExitCode::from(1);
        }
    }
    ExitCode::SUCCESS
}

fn append_indexing_csv(
    cfg: &Config,
    label: &str,
    t: &trawl::index::IndexTimings,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cfg.results_dir)?;
    let path = cfg.results_dir.join("indexing_benchmarks.csv");
    let write_header = !path.exists();
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    if write_header {
        writeln!(
            f,
            "label,num_cpu_workers,num_shards,num_documents,num_runs,\
             run_generation_ms,merge_ms,shard_emission_ms,doc_store_ms,total_ms,throughput_docs_per_sec"
        )?;
    }
    writeln!(
        f,
        "{},{},{},{},{},{:.1},{:.1},{:.1},{:.1},{:.1},{:.1}",
        label,
        cfg.effective_workers(),
        cfg.num_shards,
        t.num_documents,
        t.num_runs,
        t.run_generation_ms,
        t.merge_ms,
        t.shard_emission_ms,
        t.doc_store_ms,
        t.total_ms,
        t.throughput_docs_per_sec()
    )?;
    println!("recorded timings to {}", path.display());
    Ok(())
}
