//! Binary search matching
//!
//! Controls are sorted once; each treated record then finds its nearest
//! control with a binary search that tracks the closest score seen, and
//! widens to further neighbours through the windowed merge.

use log::info;
use rayon::prelude::*;

use crate::algorithm::matching::assembler::MatchAssembler;
use crate::algorithm::matching::merger::ControlUsage;
use crate::algorithm::matching::population::{Population, sorted_by_score};
use crate::algorithm::matching::types::{MatchSet, Neighbours, Record, Window};
use crate::config::MatchingConfig;
use crate::utils::progress;

/// Minimum treated count before queries are spread over the rayon pool
pub const PARALLEL_THRESHOLD: usize = 1000;

/// Position of the control nearest to `target` in a score-sorted slice
///
/// Equal distances resolve toward the higher score. Among controls sharing
/// the winning score, the lowest position is returned when that score is at
/// least `target` and the highest otherwise, which is the control a
/// two-pointer merge would pick. Returns `None` for an empty slice.
#[must_use]
pub fn locate_nearest(controls: &[Record], target: f64) -> Option<usize> {
    if controls.is_empty() {
        return None;
    }

    let mut lo = 0usize;
    let mut hi = controls.len();
    let mut best = 0usize;
    let mut best_diff = f64::INFINITY;

    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let diff = controls[mid].score - target;
        let adiff = diff.abs();
        if adiff < best_diff || (adiff == best_diff && controls[mid].score > controls[best].score)
        {
            best_diff = adiff;
            best = mid;
        }

        if diff > 0.0 {
            hi = mid;
        } else if diff < 0.0 {
            lo = mid + 1;
        } else {
            best = mid;
            break;
        }
    }

    let score = controls[best].score;
    if score >= target {
        while best > 0 && controls[best - 1].score == score {
            best -= 1;
        }
    } else {
        while best + 1 < controls.len() && controls[best + 1].score == score {
            best += 1;
        }
    }

    Some(best)
}

/// Nearest position plus up to `k - 1` further neighbours from the merge
///
/// Without replacement an already used nearest control is dropped and all
/// `k` neighbours come from the merge.
fn neighbours_for(
    controls: &[Record],
    target: f64,
    k: usize,
    usage: &mut ControlUsage,
) -> Neighbours {
    if k == 0 {
        return Neighbours::new();
    }
    let Some(nearest) = locate_nearest(controls, target) else {
        return Neighbours::new();
    };

    let left = Window::new(0, nearest);
    let right = Window::new(nearest + 1, controls.len());

    if usage.is_available(nearest) {
        usage.claim(&[nearest]);
        let mut chosen = Neighbours::new();
        chosen.push(nearest);
        chosen.extend(usage.merge(controls, target, left, right, k - 1));
        chosen
    } else {
        usage.merge(controls, target, left, right, k)
    }
}

/// Match every treated record, in input order, via binary search over sorted controls
///
/// Match ids follow the input order of the treated records.
#[must_use]
pub fn match_binary_search(population: &Population, config: &MatchingConfig) -> MatchSet {
    let treated = population.treated();
    let controls = sorted_by_score(population.controls());
    let k = config.nmatches;

    if treated.is_empty() || controls.is_empty() {
        return MatchSet::default();
    }

    let mut assembler = MatchAssembler::with_capacity(treated.len());

    if config.with_replacement && config.use_parallel && treated.len() >= PARALLEL_THRESHOLD {
        info!(
            "Using parallel binary search with {} threads",
            rayon::current_num_threads()
        );
        let neighbours: Vec<Neighbours> = treated
            .par_iter()
            .map(|t| neighbours_for(&controls, t.score, k, &mut ControlUsage::new(true)))
            .collect();

        for (t, chosen) in treated.iter().zip(neighbours) {
            assembler.push(t.row, chosen.iter().map(|&p| controls[p].row));
        }
        return assembler.finish();
    }

    let pb = progress::create_main_progress_bar(
        treated.len() as u64,
        Some("Binary search matching"),
        config.show_progress,
    );
    let mut usage = ControlUsage::new(config.with_replacement);

    for t in &treated {
        let chosen = neighbours_for(&controls, t.score, k, &mut usage);
        assembler.push(t.row, chosen.iter().map(|&p| controls[p].row));
        pb.inc(1);
    }

    progress::finish_progress_bar(&pb, Some("Matching complete"));
    assembler.finish()
}
