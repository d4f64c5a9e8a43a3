//! Randomized checks shared by all matching methods

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use propensity_match::algorithm::matching::{match_binary_search, match_merge_scan};
use propensity_match::{Matcher, MatchingConfig, MatchingMethod, Population, RowId};
use rand::prelude::*;

use crate::utils::{
    by_treated, nearest_distance, quantized_population, random_population, scores_by_row,
};

fn config(method: MatchingMethod, k: usize) -> MatchingConfig {
    MatchingConfig::builder().method(method).nmatches(k).build()
}

fn run(population: &Population, config: MatchingConfig) -> propensity_match::MatchSet {
    Matcher::new(config).match_population(population).unwrap()
}

/// Distances of the `k` nearest controls to `target`, ascending
fn brute_force_distances(population: &Population, target: f64, k: usize) -> Vec<f64> {
    population
        .controls()
        .iter()
        .map(|c| (c.score - target).abs())
        .sorted_by(f64::total_cmp)
        .take(k)
        .collect()
}

fn chosen_distances(scores: &HashMap<RowId, f64>, target: f64, controls: &[RowId]) -> Vec<f64> {
    controls
        .iter()
        .map(|c| (scores[c] - target).abs())
        .sorted_by(f64::total_cmp)
        .collect()
}

#[test]
fn test_single_neighbour_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..25 {
        let population = random_population(&mut rng, 300, 0.3);
        let scores = scores_by_row(&population);

        for method in MatchingMethod::ALL {
            let set = run(&population, config(method, 1));
            assert_eq!(set.len(), population.treated_count(), "{method}");
            for m in &set {
                let target = scores[&m.treated];
                assert_eq!(m.controls.len(), 1, "{method}");
                assert_eq!(
                    (scores[&m.controls[0]] - target).abs(),
                    nearest_distance(&population, target),
                    "{method}"
                );
            }
        }
    }
}

#[test]
fn test_k_nearest_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(2);
    for k in 2..=5 {
        for _ in 0..10 {
            let population = quantized_population(&mut rng, 250, 40);
            let scores = scores_by_row(&population);

            for method in [MatchingMethod::BinarySearch, MatchingMethod::MergeScan] {
                for m in &run(&population, config(method, k)) {
                    let target = scores[&m.treated];
                    assert_eq!(
                        chosen_distances(&scores, target, &m.controls),
                        brute_force_distances(&population, target, k),
                        "{method} k = {k}"
                    );
                }
            }
        }
    }
}

#[test]
fn test_locators_agree_on_every_neighbour() {
    let mut rng = StdRng::seed_from_u64(3);
    for k in 1..=4 {
        for _ in 0..10 {
            for population in [
                random_population(&mut rng, 300, 0.4),
                quantized_population(&mut rng, 300, 25),
            ] {
                let binary = run(&population, config(MatchingMethod::BinarySearch, k));
                let merge = run(&population, config(MatchingMethod::MergeScan, k));
                assert_eq!(by_treated(&binary), by_treated(&merge), "k = {k}");
            }
        }
    }
}

#[test]
fn test_interval_agrees_with_locators_for_single_neighbour() {
    let mut rng = StdRng::seed_from_u64(4);
    for _ in 0..20 {
        let population = random_population(&mut rng, 300, 0.5);
        let interval = run(&population, config(MatchingMethod::Interval, 1));
        let merge = run(&population, config(MatchingMethod::MergeScan, 1));
        assert_eq!(by_treated(&interval), by_treated(&merge));
    }
}

#[test]
fn test_every_treated_matched_once_with_dense_ids() {
    let mut rng = StdRng::seed_from_u64(5);
    let population = random_population(&mut rng, 500, 0.3);

    for method in MatchingMethod::ALL {
        let set = run(&population, config(method, 2));

        let ids: Vec<usize> = set.iter().map(|m| m.match_id).collect();
        assert_eq!(ids, (0..set.len()).collect::<Vec<_>>(), "{method}");

        let treated: HashSet<RowId> = set.iter().map(|m| m.treated).collect();
        let expected: HashSet<RowId> = population.treated().iter().map(|r| r.row).collect();
        assert_eq!(treated, expected, "{method}");
        assert_eq!(treated.len(), set.len(), "{method}");

        let controls: HashSet<RowId> = population.controls().iter().map(|r| r.row).collect();
        for m in &set {
            assert!(m.controls.iter().all(|c| controls.contains(c)), "{method}");
            assert!(m.controls.iter().all_unique(), "{method}");
        }
    }
}

#[test]
fn test_matching_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(6);
    let population = quantized_population(&mut rng, 400, 30);

    for method in MatchingMethod::ALL {
        for replacement in [true, false] {
            let config = MatchingConfig::builder()
                .method(method)
                .nmatches(3)
                .with_replacement(replacement)
                .build();
            let first = run(&population, config.clone());
            let second = run(&population, config);
            assert_eq!(first, second, "{method}");
        }
    }
}

#[test]
fn test_without_replacement_never_reuses_controls() {
    let mut rng = StdRng::seed_from_u64(8);
    for method in MatchingMethod::ALL {
        let population = random_population(&mut rng, 400, 0.2);
        let config = MatchingConfig::builder()
            .method(method)
            .nmatches(2)
            .with_replacement(false)
            .build();
        let set = run(&population, config);

        assert!(set.reused_controls().is_empty(), "{method}");
        assert!(set.neighbour_count() <= population.len() - population.treated_count());
    }
}

#[test]
fn test_parallel_binary_search_matches_sequential() {
    let mut rng = StdRng::seed_from_u64(9);
    let population = random_population(&mut rng, 3000, 0.5);
    assert!(population.treated_count() >= 1000);

    let sequential = config(MatchingMethod::BinarySearch, 3);
    let parallel = MatchingConfig {
        use_parallel: true,
        ..sequential.clone()
    };

    assert_eq!(
        match_binary_search(&population, &sequential),
        match_binary_search(&population, &parallel)
    );
}

#[test]
fn test_merge_scan_ids_follow_ascending_scores() {
    let mut rng = StdRng::seed_from_u64(10);
    let population = random_population(&mut rng, 300, 0.3);
    let scores = scores_by_row(&population);

    let set = match_merge_scan(&population, &MatchingConfig::default());
    let ordered: Vec<f64> = set.iter().map(|m| scores[&m.treated]).collect();
    assert!(ordered.windows(2).all(|w| w[0] <= w[1]));
}
