use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;

const MAX_CHARS_PER_WORD: usize = 100;

/// WordPiece encoder for cross-encoder inputs.
///
/// Vocabulary is one token per line, line number = token id, BERT
/// conventions for the special tokens. Encoding follows the usual greedy
/// longest-match-first subword split with `##` continuations; words that
/// cannot be covered map to `[UNK]`.
pub struct WordPieceEncoder {
    vocab: HashMap<String, i64>,
    cls_id: i64,
    sep_id: i64,
    pad_id: i64,
    unk_id: i64,
}

impl WordPieceEncoder {
    pub fn load(vocab_path: impl AsRef<Path>) -> Result<Self> {
        let path = vocab_path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("open vocabulary file {}", path.display()))?;
        let mut vocab = HashMap::new();
        let mut idx: i64 = 0;
        for line in text.lines() {
            let token = line.trim_end();
            if !token.is_empty() {
                vocab.insert(token.to_string(), idx);
                idx += 1;
            }
        }
        if vocab.is_empty() {
            bail!("vocabulary file {} is empty", path.display());
        }
        let lookup = |tok: &str, fallback: i64| vocab.get(tok).copied().unwrap_or(fallback);
        let enc = Self {
            cls_id: lookup("[CLS]", 101),
            sep_id: lookup("[SEP]", 102),
            pad_id: lookup("[PAD]", 0),
            unk_id: lookup("[UNK]", 100),
            vocab,
        };
        log::info!("loaded vocabulary with {} tokens", enc.vocab.len());
        Ok(enc)
    }

    pub fn sep_id(&self) -> i64 {
        self.sep_id
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    // Lowercase, split on whitespace, and break punctuation out into
    // standalone tokens.
    fn basic_tokenize(text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut cur = String::new();
        for c in text.chars() {
            let c = c.to_ascii_lowercase();
            if c.is_whitespace() || c.is_control() {
                if !cur.is_empty() {
                    tokens.push(std::mem::take(&mut cur));
                }
            } else if c.is_ascii_punctuation() {
                if !cur.is_empty() {
                    tokens.push(std::mem::take(&mut cur));
                }
                tokens.push(c.to_string());
            } else {
                cur.push(c);
            }
        }
        if !cur.is_empty() {
            tokens.push(cur);
        }
        tokens
    }

    fn wordpiece_ids(&self, word: &str, out: &mut Vec<i64>) {
        if word.chars().count() > MAX_CHARS_PER_WORD {
            out.push(self.unk_id);
            return;
        }
        let mut piece_ids = Vec::new();
        let mut start = 0usize;
        while start < word.len() {
            let mut end = word.len();
            let mut found = None;
            while start < end {
                let sub = &word[start..end];
                let candidate = if start > 0 {
                    format!("##{}", sub)
                } else {
                    sub.to_string()
                };
                if let Some(&id) = self.vocab.get(&candidate) {
                    found = Some((id, end));
                    break;
                }
                // Walk back one character, staying on a char boundary.
                end = word[..end]
                    .char_indices()
                    .next_back()
                    .map(|(i, _)| i)
                    .unwrap_or(start);
            }
            match found {
                Some((id, next)) => {
                    piece_ids.push(id);
                    start = next;
                }
                None => {
                    out.push(self.unk_id);
                    return;
                }
            }
        }
        out.extend(piece_ids);
    }

    /// Token ids for a free-text string.
    pub fn token_ids(&self, text: &str) -> Vec<i64> {
        let mut ids = Vec::new();
        for word in Self::basic_tokenize(text) {
            self.wordpiece_ids(&word, &mut ids);
        }
        ids
    }

    /// Encode `[CLS] query [SEP] document [SEP]` into the caller's fixed
    /// `input_ids` / `attention_mask` slices (both `seq_len` long). The
    /// document side is truncated first; an oversized query is truncated
    /// too, so the output always fits.
    pub fn encode_pair(
        &self,
        query_ids: &[i64],
        doc: &str,
        input_ids: &mut [i64],
        attention_mask: &mut [i64],
    ) {
        assert_eq!(input_ids.len(), attention_mask.len());
        let seq_len = input_ids.len();
        let budget = seq_len.saturating_sub(3);

        let query_take = query_ids.len().min(budget);
        let doc_ids = self.token_ids(doc);
        let doc_take = doc_ids.len().min(budget - query_take);

        let mut pos = 0usize;
        let mut push = |id: i64, ids: &mut [i64], mask: &mut [i64]| {
            ids[pos] = id;
            mask[pos] = 1;
            pos += 1;
        };
        push(self.cls_id, input_ids, attention_mask);
        for &id in &query_ids[..query_take] {
            push(id, input_ids, attention_mask);
        }
        push(self.sep_id, input_ids, attention_mask);
        for &id in &doc_ids[..doc_take] {
            push(id, input_ids, attention_mask);
        }
        push(self.sep_id, input_ids, attention_mask);

        for i in pos..seq_len {
            input_ids[i] = self.pad_id;
            attention_mask[i] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder_with(tokens: &[&str]) -> WordPieceEncoder {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        let mut text = String::from("[PAD]\n[UNK]\n[CLS]\n[SEP]\n");
        for t in tokens {
            text.push_str(t);
            text.push('\n');
        }
        std::fs::write(&path, text).unwrap();
        WordPieceEncoder::load(&path).unwrap()
    }

    #[test]
    fn special_token_ids_come_from_vocab() {
        let enc = encoder_with(&["hello"]);
        assert_eq!(enc.pad_id, 0);
        assert_eq!(enc.unk_id, 1);
        assert_eq!(enc.cls_id, 2);
        assert_eq!(enc.sep_id, 3);
        assert_eq!(enc.token_ids("hello"), vec![4]);
    }

    #[test]
    fn greedy_subword_split() {
        let enc = encoder_with(&["un", "##believ", "##able"]);
        assert_eq!(enc.token_ids("unbelievable"), vec![4, 5, 6]);
        // No covering split -> UNK.
        assert_eq!(enc.token_ids("xyz"), vec![1]);
    }

    #[test]
    fn punctuation_splits_words() {
        let enc = encoder_with(&["covid", "19", "-"]);
        assert_eq!(enc.token_ids("Covid-19"), vec![4, 6, 5]);
    }

    #[test]
    fn encode_pair_layout_and_padding() {
        let enc = encoder_with(&["q", "d"]);
        let query_ids = enc.token_ids("q");
        let mut ids = vec![0i64; 8];
        let mut mask = vec![0i64; 8];
        enc.encode_pair(&query_ids, "d d", &mut ids, &mut mask);
        // [CLS] q [SEP] d d [SEP] [PAD] [PAD]
        assert_eq!(ids, vec![2, 4, 3, 5, 5, 3, 0, 0]);
        assert_eq!(mask, vec![1, 1, 1, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn encode_pair_truncates_long_documents() {
        let enc = encoder_with(&["q", "d"]);
        let query_ids = enc.token_ids("q");
        let mut ids = vec![0i64; 6];
        let mut mask = vec![0i64; 6];
        enc.encode_pair(&query_ids, "d d d d d d d d", &mut ids, &mut mask);
        assert_eq!(ids, vec![2, 4, 3, 5, 5, 3]);
        assert_eq!(mask, vec![1; 6]);
    }
}
