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

//! Streaming access to the corpus: enumeration is cheap (metadata only),
//! content is read on demand through a short-lived memory map and normalized
//! before it leaves this module.

use anyhow::{bail, Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::normalize::Normalizer;
use crate::types::DocId;

struct DocMeta {
    name: String,
    path: PathBuf,
    size: u64,
}

/// Enumerated corpus with on-demand document reads.
///
/// Ids are dense and 0-based, assigned in the deterministic (path-sorted)
/// enumeration order, so two enumerations of the same corpus agree.
pub struct DocumentStream {
    docs: Vec<DocMeta>,
    normalizer: Normalizer,
}

impl DocumentStream {
    pub fn open(corpus_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_normalizer(corpus_dir, Normalizer::new())
    }

    pub fn open_with_normalizer(
        corpus_dir: impl AsRef<Path>,
        normalizer: Normalizer,
    ) -> Result<Self> {
        let corpus_dir = corpus_dir.as_ref();
        if !corpus_dir.is_dir() {
            bail!("corpus directory does not exist: {}", corpus_dir.display());
        }

        let mut paths: Vec<PathBuf> = Vec::new();
        let mut total_size = 0u64;
        for entry in std::fs::read_dir(corpus_dir)
            .with_context(|| format!("read corpus dir {}", corpus_dir.display()))?
        {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();

        let mut docs = Vec::with_capacity(paths.len());
        for path in paths {
            let size = std::fs::metadata(&path)?.len();
            if size == 0 {
                continue;
            }
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            total_size += size;
            docs.push(DocMeta { name, path, size });
        }

        if docs.is_empty() {
            bail!(
                "no regular files found in corpus directory {}",
                corpus_dir.display()
            );
        }
        log::info!(
            "enumerated {} documents ({:.1} MiB) under {}",
            docs.len(),
            total_size as f64 / (1024.0 * 1024.0),
            corpus_dir.display()
        );
        Ok(Self { docs, normalizer })
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn doc_name(&self, id: DocId) -> Option<&str> {
        self.docs.get(id as usize).map(|d| d.name.as_str())
    }

    pub fn doc_size(&self, id: DocId) -> Option<u64> {
        self.docs.get(id as usize).map(|d| d.size)
    }

    /// Map the file read-only, copy its bytes out and normalize. The mapping
    /// lives only for the duration of this call.
    pub fn read_document(&self, id: DocId) -> Result<String> {
        let meta = self
            .docs
            .get(id as usize)
            .with_context(|| format!("document id {} out of range", id))?;
        let file = File::open(&meta.path)
            .with_context(|| format!("open document {}", meta.path.display()))?;
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("mmap document {}", meta.path.display()))?;
        let raw = String::from_utf8_lossy(&mmap[..]);
        Ok(self.normalizer.normalize(&raw))
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumeration_is_sorted_and_skips_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "Bravo Doc").unwrap();
        std::fs::write(dir.path().join("a.txt"), "Alpha Doc").unwrap();
        std::fs::write(dir.path().join("empty.txt"), "").unwrap();

        let stream = DocumentStream::open(dir.path()).unwrap();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream.doc_name(0), Some("a"));
        assert_eq!(stream.doc_name(1), Some("b"));
    }

    #[test]
    fn read_document_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc.txt"), "The Quick, Brown FOX!").unwrap();
        let stream = DocumentStream::open(dir.path()).unwrap();
        assert_eq!(stream.read_document(0).unwrap(), "quick brown fox");
    }

    #[test]
    fn missing_or_empty_corpus_is_fatal() {
        assert!(DocumentStream::open("/nonexistent/corpus").is_err());
        let dir = tempfile::tempdir().unwrap();
        assert!(DocumentStream::open(dir.path()).is_err());
    }
}
