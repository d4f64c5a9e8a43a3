use std::path::Path;
use std::sync::Arc;

use arrow::array::{BooleanArray, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use log::{info, warn};
use propensity_match::{Matcher, MatchingConfig, MatchingMethod, RecordBatch};
use rand::prelude::*;

/// Build a synthetic population where treated records skew toward higher scores
fn synthetic_population(size: usize, treated_share: f64, seed: u64) -> anyhow::Result<RecordBatch> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut ids = Vec::with_capacity(size);
    let mut treatment = Vec::with_capacity(size);
    let mut scores = Vec::with_capacity(size);
    let mut ages = Vec::with_capacity(size);

    for i in 0..size {
        let treated = rng.random_bool(treated_share);
        let base: f64 = rng.random();
        let score = if treated { base.sqrt() } else { base * base };

        ids.push(format!("P{i:07}"));
        treatment.push(treated);
        scores.push(score);
        ages.push(rng.random_range(18..90));
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("pnr", DataType::Utf8, false),
        Field::new("treatment", DataType::Boolean, false),
        Field::new("scores", DataType::Float64, false),
        Field::new("age", DataType::Int32, false),
    ]));

    Ok(RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(BooleanArray::from(treatment)),
            Arc::new(Float64Array::from(scores)),
            Arc::new(Int32Array::from(ages)),
        ],
    )?)
}

fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    // Optional JSON configuration as first argument
    let base_config = match args.get(1) {
        Some(path) => {
            info!("Loading matching configuration from: {path}");
            MatchingConfig::from_json_file(Path::new(path))?
        }
        None => MatchingConfig::builder()
            .identity_column("pnr")
            .show_progress(true)
            .build(),
    };

    let methods: Vec<MatchingMethod> = match args.get(2) {
        Some(name) => vec![name.parse()?],
        None if args.get(1).is_some() => vec![base_config.method],
        None => MatchingMethod::ALL.to_vec(),
    };

    let population = synthetic_population(100_000, 0.1, 42)?;
    info!("Generated synthetic population of {} rows", population.num_rows());

    for method in methods {
        let config = MatchingConfig {
            method,
            ..base_config.clone()
        };
        info!("{config}");

        let matcher = Matcher::new(config);
        let result = matcher.perform_matching(&population)?;

        info!(
            "{}: {} matches, {} matched rows, {} controls reused, in {:?}",
            result.method,
            result.matches.len(),
            result.matched.num_rows(),
            result.matches.reused_controls().len(),
            result.matching_time
        );

        if result.matches.is_empty() {
            warn!("{} produced no matches", result.method);
        }
    }

    Ok(())
}
