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

mod common;

use anyhow::Result;
use common::{build_index, new_corpus, test_config};
use std::collections::HashSet;
use trawl::shard::{shard_for_term, ShardSet};
use trawl::store::DocStore;
use trawl::DocumentStream;

fn wide_corpus() -> tempfile::TempDir {
    // Enough distinct terms to spread across shards and spill several runs
    // with the tiny test block size.
    let mut files = Vec::new();
    for i in 0..20 {
        files.push((
            format!("doc{:02}.txt", i),
            format!(
                "alpha{} beta{} gamma{} shared common term{} filler words here",
                i % 5,
                i % 3,
                i % 7,
                i
            ),
        ));
    }
    let dir = tempfile::tempdir().expect("corpus tempdir");
    for (name, contents) in files {
        std::fs::write(dir.path().join(name), contents).unwrap();
    }
    dir
}

// Read back every (term, postings) pair through the public reader.
fn dump_postings(index_dir: &std::path::Path, shards: usize, corpus: &std::path::Path) -> Vec<(String, Vec<u32>)> {
    let set = ShardSet::open(index_dir, shards).unwrap();
    let stream = DocumentStream::open(corpus).unwrap();
    let mut terms: HashSet<String> = HashSet::new();
    for id in 0..stream.len() as u32 {
        for tok in stream.read_document(id).unwrap().split_whitespace() {
            terms.insert(tok.to_string());
        }
    }
    let mut out: Vec<(String, Vec<u32>)> = terms
        .into_iter()
        .map(|t| {
            let (s, loc) = set.locate(&t).expect("indexed term must be present");
            (t.clone(), set.fetch(s, loc).unwrap().into_vec())
        })
        .collect();
    out.sort();
    out
}

#[test]
fn two_builds_produce_identical_posting_lists() -> Result<()> {
    let corpus = wide_corpus();
    let shards = 8;

    let index_a = tempfile::tempdir()?;
    let index_b = tempfile::tempdir()?;
    build_index(corpus.path(), &test_config(index_a.path(), shards))?;
    build_index(corpus.path(), &test_config(index_b.path(), shards))?;

    let a = dump_postings(index_a.path(), shards, corpus.path());
    let b = dump_postings(index_b.path(), shards, corpus.path());
    assert_eq!(a, b);
    assert!(!a.is_empty());

    // With fixed worker count the whole layout is reproducible, down to the
    // bytes of every shard file.
    for s in 0..shards {
        for file in ["dict.dat", "postings.dat"] {
            let pa = trawl::shard::shard_dir(index_a.path(), s).join(file);
            let pb = trawl::shard::shard_dir(index_b.path(), s).join(file);
            assert_eq!(
                std::fs::read(&pa)?,
                std::fs::read(&pb)?,
                "shard {} {} differs between builds",
                s,
                file
            );
        }
    }
    Ok(())
}

#[test]
fn postings_are_ascending_and_terms_live_in_their_hash_shard() -> Result<()> {
    let corpus = wide_corpus();
    let shards = 8;
    let index = tempfile::tempdir()?;
    build_index(corpus.path(), &test_config(index.path(), shards))?;

    let set = ShardSet::open(index.path(), shards)?;
    for (term, postings) in dump_postings(index.path(), shards, corpus.path()) {
        assert!(
            postings.windows(2).all(|w| w[0] < w[1]),
            "postings for {:?} not strictly ascending: {:?}",
            term,
            postings
        );
        let (shard, _) = set.locate(&term).unwrap();
        assert_eq!(shard, shard_for_term(&term, shards));
    }
    Ok(())
}

#[test]
fn doc_store_covers_every_id_exactly_once() -> Result<()> {
    let corpus = wide_corpus();
    let index = tempfile::tempdir()?;
    let cfg = test_config(index.path(), 4);
    build_index(corpus.path(), &cfg)?;

    let stream = DocumentStream::open(corpus.path())?;
    let store = DocStore::open(index.path()).unwrap();
    assert_eq!(store.doc_count(), stream.len());
    for id in 0..stream.len() as u32 {
        let doc = store.get(id).unwrap().expect("every id has a record");
        assert_eq!(doc.id, id);
        assert_eq!(doc.content, stream.read_document(id)?);
        assert_eq!(store.name_of(id), stream.doc_name(id));
    }
    Ok(())
}

#[test]
fn stored_content_matches_normalized_ingestion() -> Result<()> {
    let corpus = new_corpus(&[("d0.txt", "The QUICK (brown) Fox!")]);
    let index = tempfile::tempdir()?;
    build_index(corpus.path(), &test_config(index.path(), 2))?;

    let store = DocStore::open(index.path()).unwrap();
    assert_eq!(store.get(0).unwrap().unwrap().content, "quick (brown) fox");
    Ok(())
}
