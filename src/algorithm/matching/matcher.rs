//! Core matching entry point
//!
//! This module implements the Matcher struct which orchestrates the matching process.

use std::sync::Arc;
use std::time::Instant;

use arrow::array::Float64Array;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::{info, warn};

use crate::algorithm::matching::assembler::build_matched_batch;
use crate::algorithm::matching::binary_search::match_binary_search;
use crate::algorithm::matching::interval::match_intervals;
use crate::algorithm::matching::merge_scan::match_merge_scan;
use crate::algorithm::matching::population::{Population, has_column};
use crate::algorithm::matching::scoring::{NoScoreProvider, ScoreProvider, score_population};
use crate::algorithm::matching::types::{MatchSet, MatchingResult};
use crate::config::{MatchingConfig, MatchingMethod};
use crate::error::Result;

/// Matcher pairing treated records with their nearest controls by score
///
/// The matcher holds no state between calls; each call sorts its own
/// working copy and returns a fresh result.
#[derive(Debug)]
pub struct Matcher<P = NoScoreProvider> {
    /// Matching configuration
    config: MatchingConfig,
    /// Scoring provider used when the score column is absent
    provider: P,
}

impl Matcher {
    /// Create a new matcher with the given configuration and no scoring provider
    #[must_use]
    pub const fn new(config: MatchingConfig) -> Self {
        Self {
            config,
            provider: NoScoreProvider,
        }
    }
}

impl<P: ScoreProvider> Matcher<P> {
    /// Create a matcher that scores populations lacking a score column with `provider`
    #[must_use]
    pub const fn with_score_provider(config: MatchingConfig, provider: P) -> Self {
        Self { config, provider }
    }

    /// Matching configuration
    #[must_use]
    pub const fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Scoring provider consulted when the score column is absent
    #[must_use]
    pub const fn score_provider(&self) -> &P {
        &self.provider
    }

    /// Perform matching over a record batch
    ///
    /// # Arguments
    ///
    /// * `batch` - `RecordBatch` holding the whole population
    ///
    /// # Returns
    ///
    /// Result containing the matched rows and the matches
    ///
    /// # Errors
    ///
    /// Returns an error for invalid configuration, missing columns, invalid
    /// labels or scores, or a failing scoring provider
    pub fn perform_matching(&self, batch: &RecordBatch) -> Result<MatchingResult> {
        let start_time = Instant::now();
        self.config.validate()?;

        let columns = &self.config.columns;
        let (population, working) = if has_column(batch, &columns.score) {
            (Population::from_batch(batch, columns)?, batch.clone())
        } else {
            warn!(
                "Propensity scores column '{}' not found; fitting scoring model",
                columns.score
            );
            let scores = score_population(&self.provider, batch)?;
            let population = Population::from_batch_with_scores(batch, columns, &scores)?;
            (population, append_scores(batch, &columns.score, scores)?)
        };

        let matches = self.match_population(&population)?;
        let matched = build_matched_batch(&working, &matches, columns.identity.as_deref())?;

        let elapsed = start_time.elapsed();
        info!(
            "Matching complete: {} matched rows in {:.2?}",
            matched.num_rows(),
            elapsed
        );

        Ok(MatchingResult {
            matched,
            matches,
            method: self.config.method,
            matching_time: elapsed,
        })
    }

    /// Match an already validated population with the configured method
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn match_population(&self, population: &Population) -> Result<MatchSet> {
        self.config.validate()?;
        let start_time = Instant::now();

        let treated = population.treated_count();
        let controls = population.len() - treated;
        info!(
            "Matching {} treated records with control pool of {} candidates ({}, k = {})",
            treated, controls, self.config.method, self.config.nmatches
        );

        if treated == 0 || controls == 0 {
            warn!("Nothing to match: {treated} treated, {controls} controls");
            return Ok(MatchSet::default());
        }

        let matches = match self.config.method {
            MatchingMethod::Interval => match_intervals(population, &self.config),
            MatchingMethod::BinarySearch => match_binary_search(population, &self.config),
            MatchingMethod::MergeScan => match_merge_scan(population, &self.config),
        };

        let short = matches.short_matches(self.config.nmatches).len();
        if short > 0 {
            warn!(
                "{short} of {} treated records received fewer than {} neighbours",
                matches.len(),
                self.config.nmatches
            );
        }

        let elapsed = start_time.elapsed();
        info!(
            "Matched {} treated records with {} controls ({} reused) in {:.2?} ({:.2} treated/sec)",
            matches.len(),
            matches.neighbour_count(),
            matches.reused_controls().len(),
            elapsed,
            matches.len() as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
        );

        Ok(matches)
    }
}

/// Append provider scores to the batch so they appear in the matched output
fn append_scores(batch: &RecordBatch, name: &str, scores: Vec<f64>) -> Result<RecordBatch> {
    let mut fields: Vec<Field> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    fields.push(Field::new(name, DataType::Float64, false));

    let mut columns = batch.columns().to_vec();
    columns.push(Arc::new(Float64Array::from(scores)));

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}
