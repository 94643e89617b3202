use std::path::Path;
pub use tempfile;

use anyhow::Result;
use trawl::{Config, DocumentStream};

/// Create a corpus directory populated with `(file name, contents)` pairs.
pub fn new_corpus(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("create corpus tempdir");
    for (name, contents) in files {
        std::fs::write(dir.path().join(name), contents).expect("write corpus file");
    }
    dir
}

/// Config pointing at `index_dir` with test-sized knobs: few shards, a tiny
/// block size so the merge phase actually runs, two workers.
pub fn test_config(index_dir: &Path, shards: usize) -> Config {
    let mut cfg = Config::default();
    cfg.index_dir = index_dir.to_path_buf();
    cfg.num_shards = shards;
    cfg.num_workers = 2;
    cfg.block_bytes = 64;
    cfg
}

/// Build a full on-disk index for the corpus under `index_dir`.
pub fn build_index(corpus: &Path, cfg: &Config) -> Result<()> {
    let stream = DocumentStream::open(corpus)?;
    trawl::BsbiIndexer::new(&stream, cfg).build()?;
    Ok(())
}
