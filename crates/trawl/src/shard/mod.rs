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

//! Shard layout and term routing. A term `t` lives in exactly one shard,
//! `hash(t) mod N`; the hash must be stable across processes or the index
//! becomes unreadable, hence FNV rather than the std randomized hasher.

use fnv::FnvHasher;
use std::hash::Hasher;
use std::path::{Path, PathBuf};

pub const DICT_FILE: &str = "dict.dat";
pub const POSTINGS_FILE: &str = "postings.dat";

mod reader;
pub use reader::ShardSet;

mod writer;
pub use writer::ShardEmitter;

/// Posting-list location inside a shard: byte offset into `postings.dat`
/// and the posting count (not bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskLocation {
    pub offset: u64,
    pub len: u64,
}

pub fn shard_for_term(term: &str, num_shards: usize) -> usize {
    let mut h = FnvHasher::default();
    h.write(term.as_bytes());
    (h.finish() % num_shards as u64) as usize
}

pub fn shard_dir(index_dir: &Path, shard: usize) -> PathBuf {
    index_dir.join(format!("shard_{}", shard))
}
