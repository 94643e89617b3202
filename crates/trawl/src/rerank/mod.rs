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

//! Neural reranking: a single long-lived worker thread owns the inference
//! session and its input buffers; producers submit jobs and block on a
//! promise-backed future. Cross-encoders are large and accelerator memory is
//! scarce, so there is exactly one worker.

mod promise;
mod service;
mod session;
mod wordpiece;

pub use promise::{Future, Promise};
pub use service::{RerankConfig, RerankService};
pub use session::{logits_to_score, LexicalSession, ScoringSession};
pub use wordpiece::WordPieceEncoder;
