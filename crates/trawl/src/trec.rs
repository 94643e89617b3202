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

//! TREC input parsing: SGML-ish topic files and 4-column qrels. Malformed
//! lines are skipped with a warning rather than failing the load.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::store::DocStore;
use crate::types::DocId;

/// Relevance judgments: query id -> relevant doc ids (`rel > 0` only).
pub type Qrels = HashMap<String, HashSet<DocId>>;

/// Parse a `<top><num>...<title>...</top>` topics file into
/// `(query_id, title)` pairs in file order.
pub fn load_topics(path: impl AsRef<Path>) -> Result<Vec<(String, String)>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("open topics file {}", path.display()))?;

    let mut topics = Vec::new();
    let mut current_id = String::new();
    let mut current_title = String::new();
    let mut in_top = false;

    for line in text.lines() {
        let line = line.trim();
        if line == "<top>" {
            in_top = true;
            current_id.clear();
            current_title.clear();
        } else if line == "</top>" {
            if in_top && !current_id.is_empty() && !current_title.is_empty() {
                topics.push((current_id.clone(), current_title.clone()));
            }
            in_top = false;
        } else if in_top {
            if let Some(rest) = line.split_once("<num>").map(|(_, r)| r) {
                let rest = rest.split("</num>").next().unwrap_or(rest);
                // Tolerate the "Number:" prefix some collections carry.
                let rest = rest.split_once(':').map(|(_, r)| r).unwrap_or(rest);
                current_id = rest.trim().to_string();
            } else if let Some(rest) = line.split_once("<title>").map(|(_, r)| r) {
                let rest = rest.split("</title>").next().unwrap_or(rest);
                current_title = rest.trim().to_string();
            }
        }
    }
    log::info!("loaded {} topics from {}", topics.len(), path.display());
    Ok(topics)
}

/// Parse TREC qrels (`qid 0 docname rel`), keeping positive judgments and
/// resolving document names through the store.
pub fn load_qrels(path: impl AsRef<Path>, store: &DocStore) -> Result<Qrels> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("open qrels file {}", path.display()))?;

    let mut qrels: Qrels = HashMap::new();
    let mut kept = 0usize;
    let mut unknown_docs = 0usize;
    for line in text.lines() {
        let mut parts = line.split_whitespace();
        let (Some(qid), Some(_iter), Some(doc_name), Some(rel)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            if !line.trim().is_empty() {
                log::warn!("skipping malformed qrels line: {}", line);
            }
            continue;
        };
        let Ok(rel) = rel.parse::<i32>() else {
            log::warn!("skipping malformed qrels line: {}", line);
            continue;
        };
        if rel <= 0 {
            continue;
        }
        match store.id_of(doc_name) {
            Some(id) => {
                qrels.entry(qid.to_string()).or_default().insert(id);
                kept += 1;
            }
            None => unknown_docs += 1,
        }
    }
    log::info!(
        "loaded qrels for {} queries ({} judgments)",
        qrels.len(),
        kept
    );
    if unknown_docs > 0 {
        log::warn!("{} judged documents not present in the corpus", unknown_docs);
    }
    Ok(qrels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DocStoreWriter;

    #[test]
    fn parses_topics_with_and_without_number_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("topics.txt");
        std::fs::write(
            &p,
            "<top>\n<num> Number: 1 </num>\n<title> coronavirus origin </title>\n</top>\n\
             <top>\n<num>2</num>\n<title>school reopening</title>\n</top>\n\
             <top>\n<num>3</num>\n</top>\n",
        )
        .unwrap();
        let topics = load_topics(&p).unwrap();
        assert_eq!(
            topics,
            vec![
                ("1".to_string(), "coronavirus origin".to_string()),
                ("2".to_string(), "school reopening".to_string()),
            ]
        );
    }

    #[test]
    fn qrels_keep_positive_known_docs() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = DocStoreWriter::create(dir.path()).unwrap();
        w.append(0, "alpha", "doc-a").unwrap();
        w.append(1, "bravo", "doc-b").unwrap();
        w.finish().unwrap();
        let store = DocStore::open(dir.path()).unwrap();

        let p = dir.path().join("qrels.txt");
        std::fs::write(
            &p,
            "1 0 doc-a 2\n1 0 doc-b 0\n1 0 ghost 1\n2 0 doc-b 1\nbad line\n",
        )
        .unwrap();
        let qrels = load_qrels(&p, &store).unwrap();
        assert_eq!(qrels["1"], HashSet::from([0]));
        assert_eq!(qrels["2"], HashSet::from([1]));
    }
}
