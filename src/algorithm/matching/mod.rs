//! Nearest-neighbour propensity score matching
//!
//! This module pairs every treated record with its nearest controls by
//! propensity score. It includes:
//!
//! 1. A windowed merge shared by all algorithms
//! 2. Interval matching: one scan over the whole sorted population
//! 3. Binary search matching over sorted controls
//! 4. Two-pointer merge matching of sorted treated records against sorted controls
//! 5. Match assembly into an Arrow `RecordBatch`
//!
//! Matching is with replacement by default; a control may serve several
//! treated records.

pub mod assembler;
pub mod binary_search;
pub mod interval;
pub mod matcher;
pub mod merge_scan;
pub mod merger;
pub mod population;
pub mod scoring;
pub mod types;

// Re-export key types
pub use assembler::{MATCH_ID_COLUMN, MatchAssembler, RECORD_ID_COLUMN, build_matched_batch};
pub use binary_search::{locate_nearest, match_binary_search};
pub use interval::{Interval, ScanState, Step, Symbol, match_intervals, scan_intervals};
pub use matcher::Matcher;
pub use merge_scan::match_merge_scan;
pub use merger::{ControlUsage, merge_nearest, merge_nearest_all};
pub use population::Population;
pub use scoring::{NoScoreProvider, ScoreProvider};
pub use types::{Group, Match, MatchSet, MatchingResult, Neighbours, Record, RowId, Window};
