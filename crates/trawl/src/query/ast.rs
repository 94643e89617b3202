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

use std::fmt;

/// Boolean query tree. `Term` nodes never carry children; `Not` has exactly
/// one child by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    Term(String),
    And(Vec<QueryNode>),
    Or(Vec<QueryNode>),
    Not(Box<QueryNode>),
}

impl QueryNode {
    /// Distinct leaf terms in tree order. These are the fetch targets for
    /// the retriever.
    pub fn collect_terms(&self) -> Vec<String> {
        let mut terms = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                QueryNode::Term(t) => {
                    if !terms.iter().any(|x| x == t) {
                        terms.push(t.clone());
                    }
                }
                QueryNode::And(cs) | QueryNode::Or(cs) => stack.extend(cs.iter()),
                QueryNode::Not(c) => stack.push(c),
            }
        }
        terms
    }

    fn precedence(&self) -> u8 {
        match self {
            QueryNode::Or(_) => 0,
            QueryNode::And(_) => 1,
            QueryNode::Not(_) => 2,
            QueryNode::Term(_) => 3,
        }
    }

    fn fmt_child(&self, child: &QueryNode, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Parenthesize when the child binds looser than the parent, so the
        // printed form re-parses to an equivalent tree.
        if child.precedence() < self.precedence() {
            write!(f, "({})", child)
        } else {
            write!(f, "{}", child)
        }
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryNode::Term(t) => write!(f, "{}", t),
            QueryNode::And(cs) => {
                for (i, c) in cs.iter().enumerate() {
                    if i > 0 {
                        write!(f, " and ")?;
                    }
                    self.fmt_child(c, f)?;
                }
                Ok(())
            }
            QueryNode::Or(cs) => {
                for (i, c) in cs.iter().enumerate() {
                    if i > 0 {
                        write!(f, " or ")?;
                    }
                    self.fmt_child(c, f)?;
                }
                Ok(())
            }
            QueryNode::Not(c) => {
                write!(f, "not ")?;
                self.fmt_child(c, f)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_terms_dedups_across_branches() {
        let q = QueryNode::And(vec![
            QueryNode::Term("fox".into()),
            QueryNode::Or(vec![
                QueryNode::Term("quick".into()),
                QueryNode::Term("fox".into()),
            ]),
            QueryNode::Not(Box::new(QueryNode::Term("dog".into()))),
        ]);
        let mut terms = q.collect_terms();
        terms.sort();
        assert_eq!(terms, vec!["dog", "fox", "quick"]);
    }

    #[test]
    fn display_parenthesizes_by_precedence() {
        let q = QueryNode::And(vec![
            QueryNode::Or(vec![
                QueryNode::Term("car".into()),
                QueryNode::Term("automobile".into()),
            ]),
            QueryNode::Not(Box::new(QueryNode::Term("truck".into()))),
        ]);
        assert_eq!(q.to_string(), "(car or automobile) and not truck");
    }
}
