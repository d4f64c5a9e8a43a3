//! Two-pointer merge matching
//!
//! Treated records and controls are both sorted by score. Treated records
//! are visited in ascending order while a single control pointer only moves
//! forward, so locating the boundary for every treated record costs linear
//! time overall.

use crate::algorithm::matching::assembler::MatchAssembler;
use crate::algorithm::matching::merger::ControlUsage;
use crate::algorithm::matching::population::{Population, sorted_by_score};
use crate::algorithm::matching::types::{MatchSet, Window};
use crate::config::MatchingConfig;
use crate::utils::progress;

/// Match treated records in ascending score order against sorted controls
///
/// Match ids follow the ascending score order of the treated records.
#[must_use]
pub fn match_merge_scan(population: &Population, config: &MatchingConfig) -> MatchSet {
    let treated = sorted_by_score(population.treated());
    let controls = sorted_by_score(population.controls());
    let k = config.nmatches;

    if treated.is_empty() || controls.is_empty() {
        return MatchSet::default();
    }

    let pb = progress::create_main_progress_bar(
        treated.len() as u64,
        Some("Merge scan matching"),
        config.show_progress,
    );
    let mut assembler = MatchAssembler::with_capacity(treated.len());
    let mut usage = ControlUsage::new(config.with_replacement);

    // first control whose score is not below the current treated score
    let mut boundary = 0usize;

    for t in &treated {
        while boundary < controls.len() && controls[boundary].score < t.score {
            boundary += 1;
        }

        let chosen = usage.merge(
            &controls,
            t.score,
            Window::new(0, boundary),
            Window::new(boundary, controls.len()),
            k,
        );
        assembler.push(t.row, chosen.iter().map(|&p| controls[p].row));
        pb.inc(1);
    }

    progress::finish_progress_bar(&pb, Some("Matching complete"));
    assembler.finish()
}
