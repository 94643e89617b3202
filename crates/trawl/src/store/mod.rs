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

//! On-disk document store: normalized content plus id↔name mappings, written
//! once at index build time and shared read-only across query threads.
//!
//! Layout (little-endian throughout):
//! - `documents.dat`:   `{ id: u32, content_len: u32, content: [u8] }*`
//! - `doc_offsets.dat`: `{ id: u32, offset: u64 }*` in write order
//! - `doc_names.dat`:   `{ id: u32, name_len: u32, name: [u8] }*`

use anyhow::{Context, Result};
use fnv::FnvHashMap;
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::SearchError;
use crate::types::{DocId, Document};

pub const DOCUMENTS_FILE: &str = "documents.dat";
pub const OFFSETS_FILE: &str = "doc_offsets.dat";
pub const NAMES_FILE: &str = "doc_names.dat";

/// Sequential writer used by the index build. Offsets are monotone because
/// records append in id order.
pub struct DocStoreWriter {
    documents: BufWriter<File>,
    offsets: BufWriter<File>,
    names: BufWriter<File>,
    cur_offset: u64,
    count: u64,
}

impl DocStoreWriter {
    pub fn create(index_dir: &Path) -> Result<Self> {
        let open = |name: &str| -> Result<BufWriter<File>> {
            Ok(BufWriter::new(
                File::create(index_dir.join(name))
                    .with_context(|| format!("create {}", name))?,
            ))
        };
        Ok(Self {
            documents: open(DOCUMENTS_FILE)?,
            offsets: open(OFFSETS_FILE)?,
            names: open(NAMES_FILE)?,
            cur_offset: 0,
            count: 0,
        })
    }

    pub fn append(&mut self, id: DocId, content: &str, name: &str) -> Result<()> {
        self.offsets.write_all(&id.to_le_bytes())?;
        self.offsets.write_all(&self.cur_offset.to_le_bytes())?;

        let bytes = content.as_bytes();
        self.documents.write_all(&id.to_le_bytes())?;
        self.documents.write_all(&(bytes.len() as u32).to_le_bytes())?;
        self.documents.write_all(bytes)?;
        self.cur_offset += 8 + bytes.len() as u64;

        let name_bytes = name.as_bytes();
        self.names.write_all(&id.to_le_bytes())?;
        self.names
            .write_all(&(name_bytes.len() as u32).to_le_bytes())?;
        self.names.write_all(name_bytes)?;

        self.count += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<u64> {
        self.documents.flush()?;
        self.offsets.flush()?;
        self.names.flush()?;
        Ok(self.count)
    }
}

/// Read side: offsets and names are loaded eagerly, content stays behind a
/// shared read-only map and is materialized per lookup.
pub struct DocStore {
    documents: Mmap,
    offsets: FnvHashMap<DocId, u64>,
    id_to_name: FnvHashMap<DocId, String>,
    name_to_id: HashMap<String, DocId>,
}

impl DocStore {
    pub fn open(index_dir: &Path) -> Result<Self, SearchError> {
        for name in [DOCUMENTS_FILE, OFFSETS_FILE, NAMES_FILE] {
            if !index_dir.join(name).is_file() {
                return Err(SearchError::IndexMissing(
                    index_dir.join(name).display().to_string(),
                ));
            }
        }

        let file = File::open(index_dir.join(DOCUMENTS_FILE))?;
        let documents = unsafe { Mmap::map(&file) }?;

        let offsets_bytes = std::fs::read(index_dir.join(OFFSETS_FILE))?;
        if offsets_bytes.len() % 12 != 0 {
            return Err(SearchError::IndexCorruption(
                "doc_offsets.dat length is not a multiple of the record size".into(),
            ));
        }
        let mut offsets = FnvHashMap::default();
        let mut prev: Option<u64> = None;
        for rec in offsets_bytes.chunks_exact(12) {
            let id = u32::from_le_bytes(rec[0..4].try_into().unwrap());
            let offset = u64::from_le_bytes(rec[4..12].try_into().unwrap());
            if let Some(p) = prev {
                if offset <= p {
                    return Err(SearchError::IndexCorruption(format!(
                        "doc_offsets.dat not monotone at id {}",
                        id
                    )));
                }
            }
            // Offset zero is only legal for the first record.
            if prev.is_none() && offset != 0 {
                return Err(SearchError::IndexCorruption(
                    "doc_offsets.dat does not start at offset 0".into(),
                ));
            }
            prev = Some(offset);
            offsets.insert(id, offset);
        }

        let names_bytes = std::fs::read(index_dir.join(NAMES_FILE))?;
        let (id_to_name, name_to_id) = parse_names(&names_bytes)?;

        log::info!(
            "document store opened: {} documents, {} names",
            offsets.len(),
            id_to_name.len()
        );
        Ok(Self {
            documents,
            offsets,
            id_to_name,
            name_to_id,
        })
    }

    pub fn doc_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn name_of(&self, id: DocId) -> Option<&str> {
        self.id_to_name.get(&id).map(|s| s.as_str())
    }

    pub fn id_of(&self, name: &str) -> Option<DocId> {
        self.name_to_id.get(name).copied()
    }

    /// Fetch one document's normalized content. Unknown ids return `None`;
    /// a record that does not fit the mapped file is corruption.
    pub fn get(&self, id: DocId) -> Result<Option<Document>, SearchError> {
        let Some(&offset) = self.offsets.get(&id) else {
            return Ok(None);
        };
        let start = offset as usize;
        let corrupt = |what: &str| {
            SearchError::IndexCorruption(format!("documents.dat: {} for id {}", what, id))
        };
        if start + 8 > self.documents.len() {
            return Err(corrupt("record header past EOF"));
        }
        let stored_id = u32::from_le_bytes(self.documents[start..start + 4].try_into().unwrap());
        if stored_id != id {
            return Err(corrupt("record id mismatch"));
        }
        let len =
            u32::from_le_bytes(self.documents[start + 4..start + 8].try_into().unwrap()) as usize;
        let end = start + 8 + len;
        if end > self.documents.len() {
            return Err(corrupt("content past EOF"));
        }
        let content = String::from_utf8_lossy(&self.documents[start + 8..end]).into_owned();
        Ok(Some(Document { id, content }))
    }
}

fn parse_names(
    bytes: &[u8],
) -> Result<(FnvHashMap<DocId, String>, HashMap<String, DocId>), SearchError> {
    let corrupt =
        |what: &str| SearchError::IndexCorruption(format!("doc_names.dat: {}", what));
    let mut id_to_name = FnvHashMap::default();
    let mut name_to_id = HashMap::new();
    let mut off = 0usize;
    while off < bytes.len() {
        if off + 8 > bytes.len() {
            return Err(corrupt("truncated record header"));
        }
        let id = u32::from_le_bytes(bytes[off..off + 4].try_into().unwrap());
        let len = u32::from_le_bytes(bytes[off + 4..off + 8].try_into().unwrap()) as usize;
        off += 8;
        if off + len > bytes.len() {
            return Err(corrupt("name past EOF"));
        }
        let name = String::from_utf8_lossy(&bytes[off..off + len]).into_owned();
        off += len;
        name_to_id.insert(name.clone(), id);
        id_to_name.insert(id, name);
    }
    Ok((id_to_name, name_to_id))
}
