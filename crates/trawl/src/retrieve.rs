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

//! Boolean retrieval over the sharded index: resolve the query's terms to
//! fetch tasks, pull all posting lists in parallel, then evaluate the tree.
//!
//! NOT is contextual: inside an AND it subtracts from the result built so
//! far (`a AND NOT b` = "the a's that are not b's"); at the root, where no
//! context exists, it subtracts from a synthesized universe (the union of
//! every posting list the query touched) so top-level negation stays finite.

use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;

use crate::error::SearchError;
use crate::query::QueryNode;
use crate::result_set::ResultSet;
use crate::shard::{DiskLocation, ShardSet};

pub struct Retriever {
    shards: ShardSet,
}

type PostingsCache = HashMap<String, ResultSet>;

impl Retriever {
    /// Open every shard under `index_dir`. Missing files are fatal here.
    pub fn open(index_dir: &Path, num_shards: usize) -> Result<Self, SearchError> {
        Ok(Self {
            shards: ShardSet::open(index_dir, num_shards)?,
        })
    }

    pub fn term_count(&self) -> usize {
        self.shards.term_count()
    }

    /// Execute a query tree and return the matching doc ids.
    pub fn execute(&self, query: &QueryNode) -> Result<ResultSet, SearchError> {
        let cache = self.fetch_postings(query)?;
        Ok(eval_node(query, &cache, None))
    }

    // Resolve each distinct leaf term to (shard, location); terms absent
    // from their shard simply contribute the empty set. Each task reads into
    // its own buffer, the cache insert happens after the I/O.
    fn fetch_postings(&self, query: &QueryNode) -> Result<PostingsCache, SearchError> {
        let tasks: Vec<(String, usize, DiskLocation)> = query
            .collect_terms()
            .into_iter()
            .filter_map(|term| {
                self.shards
                    .locate(&term)
                    .map(|(shard, loc)| (term, shard, loc))
            })
            .collect();

        let cache: Mutex<PostingsCache> = Mutex::new(HashMap::with_capacity(tasks.len()));
        tasks
            .into_par_iter()
            .try_for_each(|(term, shard, loc)| -> Result<(), SearchError> {
                let postings = self.shards.fetch(shard, loc)?;
                cache.lock().insert(term, postings);
                Ok(())
            })?;
        Ok(cache.into_inner())
    }
}

fn eval_node(node: &QueryNode, cache: &PostingsCache, context: Option<&ResultSet>) -> ResultSet {
    match node {
        QueryNode::Term(t) => cache.get(t).cloned().unwrap_or_default(),
        QueryNode::Or(children) => children
            .iter()
            .map(|c| eval_node(c, cache, None))
            .fold(ResultSet::new(), |acc, r| acc.union(&r)),
        QueryNode::And(children) => {
            let mut result: Option<ResultSet> = None;
            for child in children {
                result = Some(match (result, child) {
                    (Some(acc), QueryNode::Not(inner)) => {
                        // Subtract from the running AND context.
                        acc.difference(&eval_node(inner, cache, None))
                    }
                    (Some(acc), _) => acc.intersect(&eval_node(child, cache, None)),
                    (None, _) => eval_node(child, cache, context),
                });
                if result.as_ref().is_some_and(|r| r.is_empty()) {
                    break;
                }
            }
            result.unwrap_or_default()
        }
        QueryNode::Not(inner) => {
            let excluded = eval_node(inner, cache, None);
            match context {
                Some(ctx) => ctx.difference(&excluded),
                None => universe(cache).difference(&excluded),
            }
        }
    }
}

// Union of every fetched posting list: the finite stand-in for "all
// documents" when a bare NOT has nothing to subtract from.
fn universe(cache: &PostingsCache) -> ResultSet {
    cache
        .values()
        .fold(ResultSet::new(), |acc, r| acc.union(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_query;
    use crate::synonyms::SynonymStore;

    fn cache(entries: &[(&str, &[u32])]) -> PostingsCache {
        entries
            .iter()
            .map(|(t, ids)| (t.to_string(), ResultSet::from_sorted(ids.to_vec())))
            .collect()
    }

    fn eval(query: &str, cache: &PostingsCache) -> Vec<u32> {
        let tree = parse_query(query, &SynonymStore::empty()).unwrap();
        eval_node(&tree, cache, None).into_vec()
    }

    #[test]
    fn and_or_term() {
        let c = cache(&[("quick", &[0, 1]), ("fox", &[0, 2]), ("dog", &[1])]);
        assert_eq!(eval("quick and fox", &c), vec![0]);
        assert_eq!(eval("quick or fox", &c), vec![0, 1, 2]);
        assert_eq!(eval("missing", &c), Vec::<u32>::new());
    }

    #[test]
    fn not_subtracts_from_and_context() {
        let c = cache(&[("brown", &[0, 1]), ("dog", &[1])]);
        assert_eq!(eval("brown and not dog", &c), vec![0]);
    }

    #[test]
    fn root_not_uses_fetched_universe() {
        let c = cache(&[("quick", &[0, 1]), ("fox", &[0, 2]), ("dog", &[1])]);
        // Universe is {0,1,2}; not dog -> {0,2}.
        assert_eq!(eval("not dog", &c), vec![0, 2]);
        // Double negation folds back within the universe.
        assert_eq!(eval("not not dog", &c), vec![1]);
    }

    #[test]
    fn and_short_circuits_to_empty() {
        let c = cache(&[("a", &[0]), ("b", &[1]), ("c", &[0, 1])]);
        assert_eq!(eval("a and b and c", &c), Vec::<u32>::new());
    }

    #[test]
    fn empty_query_is_empty_set() {
        let c = cache(&[("a", &[0])]);
        assert_eq!(eval("", &c), Vec::<u32>::new());
    }

    #[test]
    fn and_not_equals_difference() {
        let c = cache(&[("a", &[0, 1, 2, 3]), ("b", &[1, 3])]);
        let lhs = eval("a and not b", &c);
        let a = ResultSet::from_sorted(vec![0, 1, 2, 3]);
        let b = ResultSet::from_sorted(vec![1, 3]);
        assert_eq!(lhs, a.difference(&b).into_vec());
    }
}
