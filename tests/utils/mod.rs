use std::sync::Arc;

use arrow::array::{BooleanArray, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use propensity_match::algorithm::matching::MatchSet;
use propensity_match::{Population, RecordBatch, RowId};
use rand::prelude::*;
use std::collections::HashMap;

/// Build a batch with `pnr`, `treatment` and `scores` columns
#[must_use]
pub fn population_batch(scores: &[f64], treated: &[bool]) -> RecordBatch {
    let ids: Vec<String> = (0..scores.len()).map(|i| format!("P{i:04}")).collect();
    let schema = Arc::new(Schema::new(vec![
        Field::new("pnr", DataType::Utf8, false),
        Field::new("treatment", DataType::Boolean, false),
        Field::new("scores", DataType::Float64, false),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(BooleanArray::from(treated.to_vec())),
            Arc::new(Float64Array::from(scores.to_vec())),
        ],
    )
    .expect("valid test batch")
}

/// Random population with uniform scores and roughly `treated_share` treated records
#[must_use]
pub fn random_population(rng: &mut StdRng, size: usize, treated_share: f64) -> Population {
    let scores: Vec<f64> = (0..size).map(|_| rng.random::<f64>()).collect();
    let treated: Vec<bool> = (0..size).map(|_| rng.random_bool(treated_share)).collect();
    Population::from_parts(&scores, &treated).expect("finite scores")
}

/// Random population whose scores fall on a coarse grid, producing many exact ties
#[must_use]
pub fn quantized_population(rng: &mut StdRng, size: usize, levels: u32) -> Population {
    let scores: Vec<f64> = (0..size)
        .map(|_| f64::from(rng.random_range(0..levels)) / f64::from(levels))
        .collect();
    let treated: Vec<bool> = (0..size).map(|_| rng.random_bool(0.3)).collect();
    Population::from_parts(&scores, &treated).expect("finite scores")
}

/// Score of every record by row
#[must_use]
pub fn scores_by_row(population: &Population) -> HashMap<RowId, f64> {
    population.records().iter().map(|r| (r.row, r.score)).collect()
}

/// Smallest absolute distance from `target` to any control
#[must_use]
pub fn nearest_distance(population: &Population, target: f64) -> f64 {
    population
        .controls()
        .iter()
        .map(|c| (c.score - target).abs())
        .fold(f64::INFINITY, f64::min)
}

/// Matches keyed by treated row, independent of match id order
#[must_use]
pub fn by_treated(set: &MatchSet) -> HashMap<RowId, Vec<RowId>> {
    set.iter()
        .map(|m| (m.treated, m.controls.to_vec()))
        .collect()
}
