use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::{shard_dir, shard_for_term, DICT_FILE, POSTINGS_FILE};
use crate::types::DocId;

/// Streaming writer for the `shard_k/{dict.dat, postings.dat}` pairs.
///
/// Terms arrive in merged-run order; each finished posting list is routed to
/// its shard and appended. Within a shard, postings offsets are strictly
/// monotone by construction.
pub struct ShardEmitter {
    dicts: Vec<BufWriter<File>>,
    postings: Vec<BufWriter<File>>,
    offsets: Vec<u64>,
    num_shards: usize,
}

impl ShardEmitter {
    pub fn create(index_dir: &Path, num_shards: usize) -> Result<Self> {
        let mut dicts = Vec::with_capacity(num_shards);
        let mut postings = Vec::with_capacity(num_shards);
        for s in 0..num_shards {
            let dir = shard_dir(index_dir, s);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("create shard dir {}", dir.display()))?;
            dicts.push(BufWriter::new(
                File::create(dir.join(DICT_FILE)).context("create dict.dat")?,
            ));
            postings.push(BufWriter::new(
                File::create(dir.join(POSTINGS_FILE)).context("create postings.dat")?,
            ));
        }
        Ok(Self {
            dicts,
            postings,
            offsets: vec![0; num_shards],
            num_shards,
        })
    }

    /// Append one term's posting list. `docs` must be ascending and
    /// duplicate-free (the merge stream guarantees it).
    pub fn emit(&mut self, term: &str, docs: &[DocId]) -> Result<()> {
        debug_assert!(docs.windows(2).all(|w| w[0] < w[1]));
        let s = shard_for_term(term, self.num_shards);

        let dict = &mut self.dicts[s];
        dict.write_all(term.as_bytes())?;
        dict.write_all(&[0u8])?;
        dict.write_all(&self.offsets[s].to_le_bytes())?;
        dict.write_all(&(docs.len() as u64).to_le_bytes())?;

        let post = &mut self.postings[s];
        for &d in docs {
            post.write_all(&d.to_le_bytes())?;
        }
        self.offsets[s] += (docs.len() * 4) as u64;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        for w in self.dicts.iter_mut().chain(self.postings.iter_mut()) {
            w.flush()?;
        }
        Ok(())
    }
}
