use fnv::FnvHashMap;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

use super::{shard_dir, shard_for_term, DiskLocation, DICT_FILE, POSTINGS_FILE};
use crate::error::SearchError;
use crate::result_set::ResultSet;

struct Shard {
    dictionary: FnvHashMap<String, DiskLocation>,
    // Read-only map over postings.dat; any number of concurrent readers.
    postings: Mmap,
}

/// All shards of an on-disk index, opened once and shared read-only across
/// query threads.
pub struct ShardSet {
    shards: Vec<Shard>,
}

impl ShardSet {
    /// Load every shard dictionary and map every postings file. A missing
    /// file is fatal here; a malformed dictionary surfaces as corruption.
    pub fn open(index_dir: &Path, num_shards: usize) -> Result<Self, SearchError> {
        let mut shards = Vec::with_capacity(num_shards);
        for s in 0..num_shards {
            let dir = shard_dir(index_dir, s);
            let dict_path = dir.join(DICT_FILE);
            let postings_path = dir.join(POSTINGS_FILE);
            if !dict_path.is_file() {
                return Err(SearchError::IndexMissing(dict_path.display().to_string()));
            }
            if !postings_path.is_file() {
                return Err(SearchError::IndexMissing(
                    postings_path.display().to_string(),
                ));
            }

            let dict_bytes = std::fs::read(&dict_path)?;
            let dictionary = parse_dictionary(&dict_bytes, &dict_path)?;

            let file = File::open(&postings_path)?;
            let postings = unsafe { Mmap::map(&file) }?;
            shards.push(Shard {
                dictionary,
                postings,
            });
        }
        let terms: usize = shards.iter().map(|s| s.dictionary.len()).sum();
        log::info!("opened {} shards, {} terms total", num_shards, terms);
        Ok(Self { shards })
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    pub fn term_count(&self) -> usize {
        self.shards.iter().map(|s| s.dictionary.len()).sum()
    }

    /// Dictionary lookup only; terms absent from their shard are simply not
    /// indexed (not an error).
    pub fn locate(&self, term: &str) -> Option<(usize, DiskLocation)> {
        let s = shard_for_term(term, self.shards.len());
        self.shards[s].dictionary.get(term).map(|loc| (s, *loc))
    }

    /// Read one posting list. Bounds are validated against the mapped file;
    /// a record pointing past EOF is corruption, failing this query only.
    pub fn fetch(&self, shard: usize, loc: DiskLocation) -> Result<ResultSet, SearchError> {
        let mmap = &self.shards[shard].postings;
        let start = loc.offset as usize;
        let byte_len = (loc.len as usize).checked_mul(4).ok_or_else(|| {
            SearchError::IndexCorruption(format!("posting count overflow in shard {}", shard))
        })?;
        let end = start.checked_add(byte_len).ok_or_else(|| {
            SearchError::IndexCorruption(format!("posting offset overflow in shard {}", shard))
        })?;
        if end > mmap.len() {
            return Err(SearchError::IndexCorruption(format!(
                "postings [{}, {}) past EOF ({} bytes) in shard {}",
                start,
                end,
                mmap.len(),
                shard
            )));
        }
        let mut docs = Vec::with_capacity(loc.len as usize);
        for chunk in mmap[start..end].chunks_exact(4) {
            docs.push(u32::from_le_bytes(chunk.try_into().unwrap()));
        }
        if docs.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SearchError::IndexCorruption(format!(
                "posting list not strictly ascending in shard {}",
                shard
            )));
        }
        Ok(ResultSet::from_sorted(docs))
    }
}

fn parse_dictionary(
    bytes: &[u8],
    path: &Path,
) -> Result<FnvHashMap<String, DiskLocation>, SearchError> {
    let corrupt = |what: &str| {
        SearchError::IndexCorruption(format!("{} while reading {}", what, path.display()))
    };
    let mut dict = FnvHashMap::default();
    let mut off = 0usize;
    while off < bytes.len() {
        let nul = bytes[off..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| corrupt("unterminated term"))?;
        let term = std::str::from_utf8(&bytes[off..off + nul])
            .map_err(|_| corrupt("term not valid UTF-8"))?
            .to_string();
        off += nul + 1;
        if off + 16 > bytes.len() {
            return Err(corrupt("truncated dictionary entry"));
        }
        let offset = u64::from_le_bytes(bytes[off..off + 8].try_into().unwrap());
        let len = u64::from_le_bytes(bytes[off + 8..off + 16].try_into().unwrap());
        off += 16;
        dict.insert(term, DiskLocation { offset, len });
    }
    Ok(dict)
}
