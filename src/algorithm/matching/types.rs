//! Type definitions for the matching algorithms
//!
//! This module contains the record arena, candidate windows and match
//! output types shared by all three algorithms.

use std::time::Duration;

use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use smallvec::SmallVec;

use crate::config::MatchingMethod;

/// Original row position of a record in the input population
///
/// Kept apart from positions in a sorted working sequence so that the two
/// can never be confused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub usize);

/// Group a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    /// Treated (test) record
    Treated,
    /// Control record
    Control,
}

impl Group {
    /// Group for a boolean treatment flag
    #[must_use]
    pub const fn from_flag(treated: bool) -> Self {
        if treated { Self::Treated } else { Self::Control }
    }

    /// Whether this is the treated group
    #[must_use]
    pub const fn is_treated(self) -> bool {
        matches!(self, Self::Treated)
    }
}

/// A scored population member
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    /// Original row position
    pub row: RowId,
    /// Propensity score, always finite
    pub score: f64,
    /// Treated or control
    pub group: Group,
}

impl Record {
    /// Create a new record
    #[must_use]
    pub const fn new(row: RowId, score: f64, group: Group) -> Self {
        Self { row, score, group }
    }

    /// Whether the record is treated
    #[must_use]
    pub const fn is_treated(&self) -> bool {
        self.group.is_treated()
    }
}

/// Contiguous run `start..end` of candidate positions within a sorted sequence
///
/// The left window of a merge is consumed from `end - 1` downwards and the
/// right window from `start` upwards, so both start at the end closest to
/// the target score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    /// First position in the window
    pub start: usize,
    /// One past the last position in the window
    pub end: usize,
}

impl Window {
    /// Create a window over `start..end`
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Empty window located at `at`
    #[must_use]
    pub const fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    /// Whether the window holds no positions
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Number of positions in the window
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether `pos` lies inside the window
    #[must_use]
    pub const fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }
}

/// Chosen neighbour positions, nearest first
pub type Neighbours = SmallVec<[usize; 4]>;

/// One treated anchor with its chosen control neighbours
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Dense match identifier, starting at 0 within a call
    pub match_id: usize,
    /// The treated anchor
    pub treated: RowId,
    /// Chosen controls in selection order (nearest first)
    pub controls: SmallVec<[RowId; 4]>,
}

/// Matches produced by one matching call, ordered by `match_id`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSet {
    matches: Vec<Match>,
}

impl MatchSet {
    pub(crate) const fn from_matches(matches: Vec<Match>) -> Self {
        Self { matches }
    }

    /// All matches in `match_id` order
    #[must_use]
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Iterate over the matches
    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.matches.iter()
    }

    /// Number of matches (one per treated anchor)
    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether no matches were produced
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Total number of chosen control neighbours
    #[must_use]
    pub fn neighbour_count(&self) -> usize {
        self.matches.iter().map(|m| m.controls.len()).sum()
    }

    /// Matched rows flattened in output order: anchor, then its controls
    #[must_use]
    pub fn rows(&self) -> Vec<(usize, RowId)> {
        let mut rows = Vec::with_capacity(self.matches.len() + self.neighbour_count());
        for m in &self.matches {
            rows.push((m.match_id, m.treated));
            rows.extend(m.controls.iter().map(|&row| (m.match_id, row)));
        }
        rows
    }

    /// Controls chosen by more than one match, with their use counts, ordered by row
    #[must_use]
    pub fn reused_controls(&self) -> Vec<(RowId, usize)> {
        self.matches
            .iter()
            .flat_map(|m| m.controls.iter().copied())
            .counts()
            .into_iter()
            .filter(|&(_, count)| count > 1)
            .sorted()
            .collect()
    }

    /// Matches that received fewer than `k` neighbours
    #[must_use]
    pub fn short_matches(&self, k: usize) -> Vec<&Match> {
        self.matches.iter().filter(|m| m.controls.len() < k).collect()
    }
}

impl<'a> IntoIterator for &'a MatchSet {
    type Item = &'a Match;
    type IntoIter = std::slice::Iter<'a, Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}

/// Result of a matching call over a record batch
#[derive(Debug, Clone)]
pub struct MatchingResult {
    /// Every anchor and chosen neighbour row, tagged with `match_id` and `record_id`
    pub matched: RecordBatch,
    /// The matches themselves
    pub matches: MatchSet,
    /// Algorithm that produced the matches
    pub method: MatchingMethod,
    /// Time taken for matching
    pub matching_time: Duration,
}
