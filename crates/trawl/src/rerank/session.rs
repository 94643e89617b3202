use anyhow::Result;

/// Seam to the cross-encoder. The engine neither trains nor defines the
/// model; it only hands `(input_ids, attention_mask)` tensors of shape
/// `rows × seq_len` to an opaque session and reads back one logit row per
/// input pair.
pub trait ScoringSession: Send {
    /// Score `rows` encoded pairs. Both slices hold `rows * seq_len`
    /// elements in row-major order. Returns `rows` logit vectors of the
    /// model's output width.
    fn run(
        &mut self,
        input_ids: &[i64],
        attention_mask: &[i64],
        rows: usize,
        seq_len: usize,
    ) -> Result<Vec<Vec<f32>>>;
}

/// Collapse one logit row to a scalar relevance score.
///
/// Two-logit heads are `[not-relevant, relevant]`; `σ(relevant − not)` is
/// the softmax relevant-column probability and preserves the model's
/// ranking. Anything else is taken as a raw regression score in column 0.
pub fn logits_to_score(row: &[f32]) -> f32 {
    if row.len() >= 2 {
        let x = row[1] - row[0];
        1.0 / (1.0 + (-x).exp())
    } else {
        row.first().copied().unwrap_or(0.0)
    }
}

/// Deterministic fallback session: scores a pair by token-id overlap
/// between the query segment and the document segment of the encoded
/// input. Lets the whole rerank path run (and be benchmarked) on machines
/// without an accelerator or model file.
pub struct LexicalSession {
    sep_id: i64,
}

impl LexicalSession {
    pub fn new(sep_id: i64) -> Self {
        Self { sep_id }
    }
}

impl ScoringSession for LexicalSession {
    fn run(
        &mut self,
        input_ids: &[i64],
        attention_mask: &[i64],
        rows: usize,
        seq_len: usize,
    ) -> Result<Vec<Vec<f32>>> {
        anyhow::ensure!(input_ids.len() >= rows * seq_len);
        anyhow::ensure!(attention_mask.len() >= rows * seq_len);
        let mut out = Vec::with_capacity(rows);
        for r in 0..rows {
            let ids = &input_ids[r * seq_len..(r + 1) * seq_len];
            let mask = &attention_mask[r * seq_len..(r + 1) * seq_len];
            let live = mask.iter().filter(|&&m| m != 0).count();
            let row = &ids[..live];

            // row = [CLS] query [SEP] document [SEP]
            let first_sep = row.iter().position(|&id| id == self.sep_id);
            let score = match first_sep {
                Some(sep) if sep > 1 => {
                    let query: &[i64] = &row[1..sep];
                    let doc: &[i64] = &row[sep + 1..row.len().saturating_sub(1)];
                    let hits = query.iter().filter(|id| doc.contains(id)).count();
                    hits as f32 / query.len() as f32
                }
                _ => 0.0,
            };
            out.push(vec![score]);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_logit_head_is_sigmoid_of_margin() {
        let s = logits_to_score(&[0.0, 0.0]);
        assert!((s - 0.5).abs() < 1e-6);
        assert!(logits_to_score(&[-1.0, 3.0]) > 0.9);
        assert!(logits_to_score(&[3.0, -1.0]) < 0.1);
    }

    #[test]
    fn single_logit_head_is_raw() {
        assert_eq!(logits_to_score(&[1.25]), 1.25);
        assert_eq!(logits_to_score(&[]), 0.0);
    }

    #[test]
    fn lexical_session_scores_overlap() {
        let sep = 3i64;
        let mut s = LexicalSession::new(sep);
        // Two rows of seq_len 8: query {10, 11}, docs with 2 and 0 hits.
        let ids = vec![
            2, 10, 11, sep, 10, 11, sep, 0, //
            2, 10, 11, sep, 20, 21, sep, 0,
        ];
        let mask = vec![1, 1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1, 0];
        let rows = s.run(&ids, &mask, 2, 8).unwrap();
        assert_eq!(rows.len(), 2);
        assert!((rows[0][0] - 1.0).abs() < 1e-6);
        assert_eq!(rows[1][0], 0.0);
    }
}
