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

//! Ranking-effectiveness metrics over `{query_id -> ranked [doc_id]}`
//! against binary relevance judgments. Pure functions, no I/O.

use std::collections::HashSet;

use crate::trec::Qrels;
use crate::types::DocId;

/// Mean effectiveness over a query set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Effectiveness {
    pub precision_at_10: f64,
    pub map: f64,
    pub mrr: f64,
    pub ndcg_at_10: f64,
}

pub fn precision_at_k(ranked: &[DocId], relevant: &HashSet<DocId>, k: usize) -> f64 {
    if k == 0 || relevant.is_empty() {
        return 0.0;
    }
    let hits = ranked
        .iter()
        .take(k)
        .filter(|id| relevant.contains(*id))
        .count();
    hits as f64 / k as f64
}

pub fn average_precision(ranked: &[DocId], relevant: &HashSet<DocId>) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let mut hits = 0usize;
    let mut sum = 0.0;
    for (i, id) in ranked.iter().enumerate() {
        if relevant.contains(id) {
            hits += 1;
            sum += hits as f64 / (i + 1) as f64;
        }
    }
    if hits > 0 {
        sum / relevant.len() as f64
    } else {
        0.0
    }
}

pub fn reciprocal_rank(ranked: &[DocId], relevant: &HashSet<DocId>) -> f64 {
    ranked
        .iter()
        .position(|id| relevant.contains(id))
        .map(|i| 1.0 / (i + 1) as f64)
        .unwrap_or(0.0)
}

/// Binary-gain NDCG: DCG with gain 1 at relevant positions, normalized by
/// the ideal DCG of placing all relevant docs first.
pub fn ndcg_at_k(ranked: &[DocId], relevant: &HashSet<DocId>, k: usize) -> f64 {
    if relevant.is_empty() || k == 0 {
        return 0.0;
    }
    let dcg: f64 = ranked
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, id)| relevant.contains(*id))
        .map(|(i, _)| 1.0 / ((i + 2) as f64).log2())
        .sum();
    let idcg: f64 = (0..k.min(relevant.len()))
        .map(|i| 1.0 / ((i + 2) as f64).log2())
        .sum();
    if idcg > 0.0 {
        dcg / idcg
    } else {
        0.0
    }
}

/// Mean metrics over every query that has judgments. Queries without a
/// ranking contribute zeros, the usual TREC convention.
pub fn evaluate<'a>(
    rankings: impl Iterator<Item = (&'a str, &'a [DocId])>,
    qrels: &Qrels,
) -> Effectiveness {
    let mut totals = Effectiveness::default();
    let mut n = 0usize;
    for (qid, ranked) in rankings {
        let Some(relevant) = qrels.get(qid) else {
            continue;
        };
        totals.precision_at_10 += precision_at_k(ranked, relevant, 10);
        totals.map += average_precision(ranked, relevant);
        totals.mrr += reciprocal_rank(ranked, relevant);
        totals.ndcg_at_10 += ndcg_at_k(ranked, relevant, 10);
        n += 1;
    }
    if n > 0 {
        totals.precision_at_10 /= n as f64;
        totals.map /= n as f64;
        totals.mrr /= n as f64;
        totals.ndcg_at_10 /= n as f64;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(ids: &[DocId]) -> HashSet<DocId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn precision_counts_hits_in_prefix() {
        let relevant = rel(&[1, 3]);
        assert_eq!(precision_at_k(&[1, 2, 3, 4], &relevant, 2), 0.5);
        assert_eq!(precision_at_k(&[1, 3], &relevant, 2), 1.0);
        assert_eq!(precision_at_k(&[], &relevant, 10), 0.0);
    }

    #[test]
    fn average_precision_matches_hand_computation() {
        // Relevant at ranks 1 and 3 of two relevant total:
        // AP = (1/1 + 2/3) / 2
        let relevant = rel(&[10, 30]);
        let ap = average_precision(&[10, 20, 30], &relevant);
        assert!((ap - (1.0 + 2.0 / 3.0) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn reciprocal_rank_of_first_hit() {
        let relevant = rel(&[5]);
        assert_eq!(reciprocal_rank(&[9, 5, 1], &relevant), 0.5);
        assert_eq!(reciprocal_rank(&[9, 1], &relevant), 0.0);
    }

    #[test]
    fn ndcg_perfect_ranking_is_one() {
        let relevant = rel(&[1, 2]);
        let n = ndcg_at_k(&[1, 2, 3], &relevant, 10);
        assert!((n - 1.0).abs() < 1e-9);
        let worse = ndcg_at_k(&[3, 1, 2], &relevant, 10);
        assert!(worse < n);
    }

    #[test]
    fn evaluate_averages_over_judged_queries() {
        let mut qrels = Qrels::new();
        qrels.insert("1".into(), rel(&[0]));
        qrels.insert("2".into(), rel(&[7]));
        let r1: Vec<DocId> = vec![0];
        let r2: Vec<DocId> = vec![1, 7];
        let rankings = vec![
            ("1", r1.as_slice()),
            ("2", r2.as_slice()),
            ("3", &[] as &[DocId]),
        ];
        let eff = evaluate(rankings.into_iter(), &qrels);
        assert!((eff.mrr - 0.75).abs() < 1e-9);
    }
}
