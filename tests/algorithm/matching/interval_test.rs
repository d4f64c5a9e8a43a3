use std::collections::HashMap;

use propensity_match::algorithm::matching::{match_intervals, scan_intervals};
use propensity_match::{MatchingConfig, Population, RowId};
use rand::prelude::*;

use crate::utils::{nearest_distance, random_population, scores_by_row};

#[test]
fn test_control_shared_across_treated_run() {
    // C 0.40 | T 0.48, T 0.49 | C 0.50, C 0.70
    let population =
        Population::from_parts(&[0.40, 0.48, 0.49, 0.50, 0.70], &[false, true, true, false, false])
            .unwrap();
    let set = match_intervals(&population, &MatchingConfig::default());

    assert_eq!(set.len(), 2);
    assert_eq!(set.matches()[0].match_id, 0);
    assert_eq!(set.matches()[0].treated, RowId(1));
    assert_eq!(set.matches()[0].controls.as_slice(), &[RowId(3)]);
    assert_eq!(set.matches()[1].match_id, 1);
    assert_eq!(set.matches()[1].treated, RowId(2));
    assert_eq!(set.matches()[1].controls.as_slice(), &[RowId(3)]);
    assert_eq!(set.reused_controls(), vec![(RowId(3), 2)]);
}

#[test]
fn test_without_replacement_falls_back_to_next_nearest() {
    let population =
        Population::from_parts(&[0.40, 0.48, 0.49, 0.50, 0.70], &[false, true, true, false, false])
            .unwrap();
    let config = MatchingConfig::builder().with_replacement(false).build();
    let set = match_intervals(&population, &config);

    assert_eq!(set.matches()[0].controls.as_slice(), &[RowId(3)]);
    assert_eq!(set.matches()[1].controls.as_slice(), &[RowId(0)]);
    assert!(set.reused_controls().is_empty());
}

#[test]
fn test_adjacent_runs_share_single_control() {
    // both treated runs border the single control
    let population = Population::from_parts(
        &[0.1, 0.2, 0.3, 0.9],
        &[true, false, true, true],
    )
    .unwrap();
    let config = MatchingConfig::builder().nmatches(2).build();
    let set = match_intervals(&population, &config);

    assert_eq!(set.len(), 3);
    for m in &set {
        assert_eq!(m.controls.as_slice(), &[RowId(1)]);
    }
}

#[test]
fn test_neighbours_come_from_bracketing_runs() {
    let mut rng = StdRng::seed_from_u64(7);
    let population = random_population(&mut rng, 400, 0.35);
    let config = MatchingConfig::builder().nmatches(3).build();

    let sequence = population.sorted();
    let position: HashMap<RowId, usize> =
        sequence.iter().enumerate().map(|(i, r)| (r.row, i)).collect();

    let mut allowed = HashMap::new();
    for interval in scan_intervals(&sequence) {
        for pos in interval.treated.start..interval.treated.end {
            allowed.insert(sequence[pos].row, interval);
        }
    }
    assert_eq!(allowed.len(), population.treated_count());

    let set = match_intervals(&population, &config);
    assert_eq!(set.len(), population.treated_count());

    for m in &set {
        let interval = allowed[&m.treated];
        let capacity = interval.leading.len() + interval.trailing.len();
        assert_eq!(m.controls.len(), capacity.min(3));
        for control in &m.controls {
            let pos = position[control];
            assert!(interval.leading.contains(pos) || interval.trailing.contains(pos));
        }
    }
}

#[test]
fn test_single_neighbour_is_globally_nearest() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..20 {
        let population = random_population(&mut rng, 200, 0.4);
        let scores = scores_by_row(&population);
        let set = match_intervals(&population, &MatchingConfig::default());

        for m in &set {
            let target = scores[&m.treated];
            let chosen = (scores[&m.controls[0]] - target).abs();
            assert_eq!(chosen, nearest_distance(&population, target));
        }
    }
}
