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

//! Benchmark bookkeeping: aggregate per-query metrics into one CSV row and
//! append it to `results/all_benchmarks.csv`. The header is written only
//! when the file does not exist yet, so repeated runs accumulate.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::eval::Effectiveness;
use crate::types::QueryMetrics;

pub const BENCHMARKS_CSV: &str = "all_benchmarks.csv";

const CSV_HEADER: &str = "label,num_cpu_workers,use_reranking,query_processing_time_ms,\
throughput_qps,precision_at_10,map,mrr,ndcg_at_10,avg_retrieval_ms,avg_reranking_ms,\
median_latency_ms,p95_latency_ms";

/// One benchmark configuration's aggregated outcome.
#[derive(Debug, Clone)]
pub struct BenchmarkRecord {
    pub label: String,
    pub num_cpu_workers: usize,
    pub use_reranking: bool,
    pub query_processing_time_ms: f64,
    pub effectiveness: Effectiveness,
    pub avg_retrieval_ms: f64,
    pub avg_reranking_ms: f64,
    pub median_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub num_queries: usize,
}

impl BenchmarkRecord {
    pub fn from_metrics(
        label: &str,
        num_cpu_workers: usize,
        use_reranking: bool,
        total_ms: f64,
        effectiveness: Effectiveness,
        metrics: &[QueryMetrics],
    ) -> Self {
        let n = metrics.len().max(1) as f64;
        let avg_retrieval_ms = metrics.iter().map(|m| m.retrieval_ms).sum::<f64>() / n;
        let avg_reranking_ms = metrics.iter().map(|m| m.reranking_ms).sum::<f64>() / n;

        let mut latencies: Vec<f64> = metrics.iter().map(|m| m.total_ms()).collect();
        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        Self {
            label: label.to_string(),
            num_cpu_workers,
            use_reranking,
            query_processing_time_ms: total_ms,
            effectiveness,
            avg_retrieval_ms,
            avg_reranking_ms,
            median_latency_ms: percentile(&latencies, 0.50),
            p95_latency_ms: percentile(&latencies, 0.95),
            num_queries: metrics.len(),
        }
    }

    pub fn throughput_qps(&self) -> f64 {
        if self.query_processing_time_ms > 0.0 {
            self.num_queries as f64 * 1000.0 / self.query_processing_time_ms
        } else {
            0.0
        }
    }

    fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{:.3},{:.3},{:.4},{:.4},{:.4},{:.4},{:.3},{:.3},{:.3},{:.3}",
            self.label,
            self.num_cpu_workers,
            self.use_reranking,
            self.query_processing_time_ms,
            self.throughput_qps(),
            self.effectiveness.precision_at_10,
            self.effectiveness.map,
            self.effectiveness.mrr,
            self.effectiveness.ndcg_at_10,
            self.avg_retrieval_ms,
            self.avg_reranking_ms,
            self.median_latency_ms,
            self.p95_latency_ms,
        )
    }
}

// Nearest-rank percentile over an already sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((p * sorted.len() as f64).ceil() as usize).clamp(1, sorted.len());
    sorted[rank - 1]
}

/// Append one record to `<results_dir>/all_benchmarks.csv`, creating the
/// directory and emitting the header on first use.
pub fn append_record(results_dir: &Path, record: &BenchmarkRecord) -> Result<()> {
    std::fs::create_dir_all(results_dir)
        .with_context(|| format!("create results dir {}", results_dir.display()))?;
    let path = results_dir.join(BENCHMARKS_CSV);
    let write_header = !path.exists();
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;
    if write_header {
        writeln!(f, "{}", CSV_HEADER)?;
    }
    writeln!(f, "{}", record.to_csv_row())?;
    log::info!("appended benchmark '{}' to {}", record.label, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: &str) -> BenchmarkRecord {
        let metrics = vec![
            QueryMetrics {
                query_id: "1".into(),
                num_candidates: 10,
                retrieval_ms: 2.0,
                reranking_ms: 8.0,
            },
            QueryMetrics {
                query_id: "2".into(),
                num_candidates: 5,
                retrieval_ms: 4.0,
                reranking_ms: 0.0,
            },
        ];
        BenchmarkRecord::from_metrics(label, 4, true, 20.0, Effectiveness::default(), &metrics)
    }

    #[test]
    fn aggregates_latencies() {
        let r = record("run");
        assert!((r.avg_retrieval_ms - 3.0).abs() < 1e-9);
        assert!((r.avg_reranking_ms - 4.0).abs() < 1e-9);
        assert_eq!(r.median_latency_ms, 4.0);
        assert_eq!(r.p95_latency_ms, 10.0);
        assert!((r.throughput_qps() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn header_written_once_rows_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        append_record(dir.path(), &record("first")).unwrap();
        append_record(dir.path(), &record("second")).unwrap();

        let text = std::fs::read_to_string(dir.path().join(BENCHMARKS_CSV)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("label,num_cpu_workers,use_reranking"));
        assert!(lines[1].starts_with("first,4,true"));
        assert!(lines[2].starts_with("second,4,true"));
    }
}
