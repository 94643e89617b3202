pub mod bsbi;
mod run_io;

pub use bsbi::{BsbiIndexer, IndexTimings};
