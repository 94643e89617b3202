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

use std::error::Error;
use std::fmt::{self, Display};

/// Typed errors surfaced by query execution and reranking.
///
/// Build-time failures propagate as `anyhow::Error`; this enum covers the
/// query path, where callers need to distinguish recoverable conditions
/// (a malformed query, a cancelled rerank job) from fatal ones (a missing
/// index).
#[derive(Debug)]
pub enum SearchError {
    /// A required shard or document-store file is absent. Fatal at startup.
    IndexMissing(String),
    /// Short read, offset past EOF or a length field overflowing the file.
    /// Fails the current query; later queries may still succeed.
    IndexCorruption(String),
    /// Parser rejected the query. Carries the token position (0-based) and
    /// the offending token text.
    MalformedQuery { position: usize, token: String },
    /// The rerank worker is in a failed state (model load failed); Boolean
    /// retrieval remains usable.
    RerankUnavailable(String),
    /// Per-job inference failure; the worker itself stays live.
    InferenceError(String),
    /// The rerank service shut down before this job was dequeued.
    Cancelled,
    /// Fallback for other textual errors.
    Other(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::IndexMissing(s) => write!(f, "index missing: {}", s),
            SearchError::IndexCorruption(s) => write!(f, "index corruption: {}", s),
            SearchError::MalformedQuery { position, token } => {
                write!(f, "malformed query at token {}: '{}'", position, token)
            }
            SearchError::RerankUnavailable(s) => write!(f, "reranking unavailable: {}", s),
            SearchError::InferenceError(s) => write!(f, "inference error: {}", s),
            SearchError::Cancelled => write!(f, "rerank job cancelled"),
            SearchError::Other(s) => write!(f, "error: {}", s),
        }
    }
}

impl Error for SearchError {}

// Conversions from common error types for easier propagation in binaries.
impl From<std::io::Error> for SearchError {
    fn from(e: std::io::Error) -> Self {
        SearchError::Other(e.to_string())
    }
}

impl From<anyhow::Error> for SearchError {
    fn from(e: anyhow::Error) -> Self {
        SearchError::Other(e.to_string())
    }
}

impl SearchError {
    /// True when later queries against the same index may still succeed.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SearchError::IndexMissing(_))
    }
}
