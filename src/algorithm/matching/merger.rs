//! Windowed nearest-neighbour merge
//!
//! Given a target score and two candidate windows of a score-sorted sequence,
//! one lying below the target and one above it, the merger walks both windows
//! outward from the target and picks the `k` closest candidates, like the
//! merge step of a merge sort keyed on distance.

use rustc_hash::FxHashSet;

use crate::algorithm::matching::types::{Neighbours, Record, Window};

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Select up to `k` candidates nearest to `target` from `left` and `right`
///
/// `left` holds positions whose scores are at most `target` and is consumed
/// from its top end downwards; `right` holds positions whose scores are at
/// least `target` and is consumed from its bottom end upwards. On equal
/// distance the right (higher score) candidate wins. Positions for which
/// `is_available` returns false are skipped. Fewer than `k` positions are
/// returned when the windows run out.
pub fn merge_nearest<F>(
    records: &[Record],
    target: f64,
    left: Window,
    right: Window,
    k: usize,
    is_available: F,
) -> Neighbours
where
    F: Fn(usize) -> bool,
{
    debug_assert!(left.is_empty() || left.end <= records.len());
    debug_assert!(right.is_empty() || right.end <= records.len());

    let mut chosen = Neighbours::new();
    // next left candidate is `lcur - 1`, next right candidate is `rcur`
    let mut lcur = left.end;
    let mut rcur = right.start;

    while chosen.len() < k {
        while lcur > left.start && !is_available(lcur - 1) {
            lcur -= 1;
        }
        while rcur < right.end && !is_available(rcur) {
            rcur += 1;
        }

        let has_left = lcur > left.start;
        let has_right = rcur < right.end;

        let side = match (has_left, has_right) {
            (true, true) => {
                let ldiff = target - records[lcur - 1].score;
                let rdiff = records[rcur].score - target;
                debug_assert!(ldiff >= 0.0 && rdiff >= 0.0);
                if ldiff < rdiff { Side::Left } else { Side::Right }
            }
            (true, false) => Side::Left,
            (false, true) => Side::Right,
            (false, false) => break,
        };

        match side {
            Side::Left => {
                lcur -= 1;
                chosen.push(lcur);
            }
            Side::Right => {
                chosen.push(rcur);
                rcur += 1;
            }
        }
    }

    chosen
}

/// Merge with every candidate available
pub fn merge_nearest_all(
    records: &[Record],
    target: f64,
    left: Window,
    right: Window,
    k: usize,
) -> Neighbours {
    merge_nearest(records, target, left, right, k, |_| true)
}

/// Tracks which positions of a working sequence have been handed out
///
/// With replacement every position stays available; without it, a position
/// chosen once is skipped by every later merge in the same call.
#[derive(Debug, Default)]
pub struct ControlUsage {
    used: Option<FxHashSet<usize>>,
}

impl ControlUsage {
    /// Create a tracker for the given replacement policy
    #[must_use]
    pub fn new(with_replacement: bool) -> Self {
        Self {
            used: (!with_replacement).then(FxHashSet::default),
        }
    }

    /// Whether `pos` may still be chosen
    #[must_use]
    pub fn is_available(&self, pos: usize) -> bool {
        self.used.as_ref().is_none_or(|used| !used.contains(&pos))
    }

    /// Mark positions as chosen
    pub fn claim(&mut self, positions: &[usize]) {
        if let Some(used) = self.used.as_mut() {
            used.extend(positions.iter().copied());
        }
    }

    /// Merge over the available candidates and claim the chosen ones
    pub fn merge(
        &mut self,
        records: &[Record],
        target: f64,
        left: Window,
        right: Window,
        k: usize,
    ) -> Neighbours {
        let chosen = merge_nearest(records, target, left, right, k, |pos| self.is_available(pos));
        self.claim(&chosen);
        chosen
    }
}
