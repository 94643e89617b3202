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

use std::collections::HashMap;
use std::path::Path;

/// Synonym store backing query expansion.
///
/// File format: one line per head term, `head: syn1, syn2, ...`. Blank lines
/// and lines starting with `#` are ignored. Heads and synonyms are lowercased
/// on load; lookup is exact match on the normalized head.
#[derive(Debug, Default)]
pub struct SynonymStore {
    map: HashMap<String, Vec<String>>,
}

impl SynonymStore {
    /// Empty store; queries expand to bare terms.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from `path`. A missing file is non-fatal: expansion is simply
    /// disabled.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                log::warn!(
                    "could not open synonym file {}: {} (query expansion disabled)",
                    path.display(),
                    e
                );
                return Self::default();
            }
        };

        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((head, rest)) = line.split_once(':') else {
                continue;
            };
            let head = head.trim().to_lowercase();
            if head.is_empty() {
                continue;
            }
            let syns: Vec<String> = rest
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
            if !syns.is_empty() {
                map.insert(head, syns);
            }
        }
        log::info!("loaded {} synonym heads from {}", map.len(), path.display());
        Self { map }
    }

    pub fn get(&self, term: &str) -> Option<&[String]> {
        self.map.get(term).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_heads_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("synonyms.txt");
        std::fs::write(
            &p,
            "# medical synonyms\n\nCar: Automobile, Vehicle\ncovid: sars cov 2,coronavirus\nbroken-line\nempty:\n",
        )
        .unwrap();
        let store = SynonymStore::load(&p);
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.get("car").unwrap(),
            &["automobile".to_string(), "vehicle".to_string()][..]
        );
        assert!(store.get("empty").is_none());
        assert!(store.get("Car").is_none(), "lookup is on the normalized head");
    }

    #[test]
    fn missing_file_yields_empty_store() {
        let store = SynonymStore::load("/nonexistent/synonyms.txt");
        assert!(store.is_empty());
        assert!(store.get("car").is_none());
    }
}
