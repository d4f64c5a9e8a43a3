//! A Rust library for nearest-neighbour propensity score matching with
//! replacement over Arrow record batches.
//!
//! Three algorithms solve the same problem under different access patterns:
//! a block-local interval scan, a per-record binary search and a two-pointer
//! merge. All of them pick neighbours through a shared windowed merge.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod utils;

// Re-export the most common types for easier use
pub use algorithm::matching::{
    Group, Match, MatchSet, Matcher, MatchingResult, Population, Record, RowId, ScoreProvider,
};
pub use config::{ColumnConfig, MatchingConfig, MatchingMethod};
pub use error::{MatchingError, Result};

// Arrow types
pub use arrow::record_batch::RecordBatch;
