//! Scoring provider capability
//!
//! Propensity scores are computed outside this crate. When a population
//! arrives without a score column, the matcher asks an injected provider to
//! fit a model and predict one score per row.

use arrow::record_batch::RecordBatch;

use crate::error::{MatchingError, Result};

/// Fits a propensity model on a population and predicts its scores
pub trait ScoreProvider {
    /// Fitted model
    type Model;

    /// Fit a model on the population
    fn fit(&self, population: &RecordBatch) -> Result<Self::Model>;

    /// Predict one score per row of the population
    fn predict(&self, model: &Self::Model, population: &RecordBatch) -> Result<Vec<f64>>;
}

/// Provider used when none is injected; always reports missing scores
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScoreProvider;

impl ScoreProvider for NoScoreProvider {
    type Model = ();

    fn fit(&self, _population: &RecordBatch) -> Result<Self::Model> {
        Err(MatchingError::MissingScores(
            "score column absent and no scoring provider configured".to_string(),
        ))
    }

    fn predict(&self, _model: &Self::Model, _population: &RecordBatch) -> Result<Vec<f64>> {
        Err(MatchingError::MissingScores(
            "score column absent and no scoring provider configured".to_string(),
        ))
    }
}

/// Fit then predict, checking that one score comes back per row
pub(crate) fn score_population<P: ScoreProvider>(
    provider: &P,
    population: &RecordBatch,
) -> Result<Vec<f64>> {
    let model = provider.fit(population)?;
    let scores = provider.predict(&model, population)?;
    if scores.len() != population.num_rows() {
        return Err(MatchingError::ScoringError(format!(
            "scoring provider returned {} scores for {} rows",
            scores.len(),
            population.num_rows()
        )));
    }
    Ok(scores)
}
