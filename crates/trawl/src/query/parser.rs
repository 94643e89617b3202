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

//! Recursive-descent Boolean parser.
//!
//! Grammar, lowest to highest precedence:
//! ```text
//! expression := term ( "or" term )*
//! term       := factor ( ("and")? factor )*     -- juxtaposition is AND
//! factor     := "not" factor | "(" expression ")" | WORD
//! ```
//! `WORD` is any token outside `{and, or, not, (, )}`. Each WORD is expanded
//! through the synonym store into an OR of its variants (collapsed back to a
//! bare term when there are none).

use crate::error::SearchError;
use crate::query::QueryNode;
use crate::synonyms::SynonymStore;

/// Parse a normalized query string into a tree. Empty input yields an empty
/// `And`, which evaluates to the empty result set.
pub fn parse_query(input: &str, synonyms: &SynonymStore) -> Result<QueryNode, SearchError> {
    let tokens = lex(input);
    let mut p = Parser {
        tokens,
        pos: 0,
        synonyms,
    };
    if p.tokens.is_empty() {
        return Ok(QueryNode::And(Vec::new()));
    }
    let node = p.expression()?;
    if p.pos < p.tokens.len() {
        // A leftover token here can only be an unmatched ')'.
        return Err(p.error_at(p.pos));
    }
    Ok(node)
}

// Parentheses act as standalone tokens even when glued to a word.
fn lex(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut cur = String::new();
    for c in input.chars() {
        match c {
            '(' | ')' => {
                if !cur.is_empty() {
                    tokens.push(std::mem::take(&mut cur));
                }
                tokens.push(c.to_string());
            }
            c if c.is_whitespace() => {
                if !cur.is_empty() {
                    tokens.push(std::mem::take(&mut cur));
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() {
        tokens.push(cur);
    }
    tokens
}

struct Parser<'a> {
    tokens: Vec<String>,
    pos: usize,
    synonyms: &'a SynonymStore,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(|s| s.as_str())
    }

    fn error_at(&self, pos: usize) -> SearchError {
        SearchError::MalformedQuery {
            position: pos,
            token: self
                .tokens
                .get(pos)
                .cloned()
                .unwrap_or_else(|| "<end of query>".to_string()),
        }
    }

    fn expression(&mut self) -> Result<QueryNode, SearchError> {
        let mut children = vec![self.term()?];
        while self.peek() == Some("or") {
            self.pos += 1;
            children.push(self.term()?);
        }
        Ok(if children.len() == 1 {
            children.pop().unwrap()
        } else {
            QueryNode::Or(children)
        })
    }

    fn term(&mut self) -> Result<QueryNode, SearchError> {
        let mut children = vec![self.factor()?];
        loop {
            match self.peek() {
                Some("and") => {
                    self.pos += 1;
                    children.push(self.factor()?);
                }
                Some("or") | Some(")") | None => break,
                Some(_) => children.push(self.factor()?),
            }
        }
        Ok(if children.len() == 1 {
            children.pop().unwrap()
        } else {
            QueryNode::And(children)
        })
    }

    fn factor(&mut self) -> Result<QueryNode, SearchError> {
        match self.peek() {
            Some("not") => {
                self.pos += 1;
                Ok(QueryNode::Not(Box::new(self.factor()?)))
            }
            Some("(") => {
                self.pos += 1;
                let inner = self.expression()?;
                if self.peek() != Some(")") {
                    return Err(self.error_at(self.pos));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(word) if word != "and" && word != "or" && word != ")" => {
                let node = self.expand_word(word);
                self.pos += 1;
                Ok(node)
            }
            _ => Err(self.error_at(self.pos)),
        }
    }

    fn expand_word(&self, word: &str) -> QueryNode {
        let mut variants = vec![word.to_string()];
        if let Some(syns) = self.synonyms.get(word) {
            for s in syns {
                if !variants.iter().any(|v| v == s) {
                    variants.push(s.clone());
                }
            }
        }
        if variants.len() == 1 {
            QueryNode::Term(variants.pop().unwrap())
        } else {
            QueryNode::Or(variants.into_iter().map(QueryNode::Term).collect())
        }
    }
}
