//! Population extraction and validation
//!
//! This module turns an Arrow `RecordBatch` (or plain score/label vectors)
//! into a validated arena of [`Record`]s addressed by their original row.

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array};
use arrow::compute;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use crate::algorithm::matching::types::{Group, Record, RowId};
use crate::config::ColumnConfig;
use crate::error::{MatchingError, Result};

/// Validated scored population
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Population {
    records: Vec<Record>,
}

impl Population {
    /// Create a population from records, rejecting non-finite scores
    pub fn new(records: Vec<Record>) -> Result<Self> {
        if let Some(bad) = records.iter().find(|r| !r.score.is_finite()) {
            return Err(MatchingError::invalid_input(format!(
                "score for row {} is not finite: {}",
                bad.row.0, bad.score
            )));
        }
        Ok(Self { records })
    }

    /// Create a population from parallel score and treatment vectors
    ///
    /// Row ids are the positions in the vectors.
    pub fn from_parts(scores: &[f64], treated: &[bool]) -> Result<Self> {
        if scores.len() != treated.len() {
            return Err(MatchingError::invalid_input(format!(
                "{} scores given for {} treatment labels",
                scores.len(),
                treated.len()
            )));
        }
        let records = scores
            .iter()
            .zip(treated)
            .enumerate()
            .map(|(i, (&score, &flag))| Record::new(RowId(i), score, Group::from_flag(flag)))
            .collect();
        Self::new(records)
    }

    /// Read a population from the configured treatment and score columns
    pub fn from_batch(batch: &RecordBatch, columns: &ColumnConfig) -> Result<Self> {
        let scores = extract_scores(batch, &columns.score)?;
        Self::from_batch_with_scores(batch, columns, &scores)
    }

    /// Read treatment labels from `batch` and pair them with externally computed scores
    pub fn from_batch_with_scores(
        batch: &RecordBatch,
        columns: &ColumnConfig,
        scores: &[f64],
    ) -> Result<Self> {
        let groups = extract_groups(batch, &columns.treatment)?;
        if scores.len() != groups.len() {
            return Err(MatchingError::invalid_input(format!(
                "{} scores given for {} rows",
                scores.len(),
                groups.len()
            )));
        }
        let records = scores
            .iter()
            .zip(groups)
            .enumerate()
            .map(|(i, (&score, group))| Record::new(RowId(i), score, group))
            .collect();
        Self::new(records)
    }

    /// All records in input order
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the population is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Treated records in input order
    #[must_use]
    pub fn treated(&self) -> Vec<Record> {
        self.records.iter().filter(|r| r.is_treated()).copied().collect()
    }

    /// Control records in input order
    #[must_use]
    pub fn controls(&self) -> Vec<Record> {
        self.records.iter().filter(|r| !r.is_treated()).copied().collect()
    }

    /// Number of treated records
    #[must_use]
    pub fn treated_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_treated()).count()
    }

    /// Working copy of all records sorted ascending by score
    #[must_use]
    pub fn sorted(&self) -> Vec<Record> {
        sorted_by_score(self.records.clone())
    }
}

/// Stable ascending sort by score; ties keep their input order
#[must_use]
pub fn sorted_by_score(mut records: Vec<Record>) -> Vec<Record> {
    records.sort_by(|a, b| a.score.total_cmp(&b.score));
    records
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| MatchingError::MissingColumn(format!("{name} column not found")))?;
    Ok(batch.column(idx))
}

/// Whether `batch` carries a column called `name`
#[must_use]
pub fn has_column(batch: &RecordBatch, name: &str) -> bool {
    batch.schema().index_of(name).is_ok()
}

/// Extract the score column as finite `f64` values
pub fn extract_scores(batch: &RecordBatch, name: &str) -> Result<Vec<f64>> {
    let col = column(batch, name)?;
    if !col.data_type().is_numeric() {
        return Err(MatchingError::invalid_input(format!(
            "{name} column has non-numeric type {}",
            col.data_type()
        )));
    }
    if col.null_count() > 0 {
        return Err(MatchingError::invalid_input(format!(
            "{name} column contains {} null scores",
            col.null_count()
        )));
    }

    let cast = compute::cast(col, &DataType::Float64)?;
    let scores = cast
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| MatchingError::invalid_input(format!("{name} column is not a float array")))?;

    Ok(scores.values().to_vec())
}

/// Extract the treatment column as groups
///
/// Accepts a boolean column or an integer column holding only 0 and 1.
pub fn extract_groups(batch: &RecordBatch, name: &str) -> Result<Vec<Group>> {
    let col = column(batch, name)?;
    if col.null_count() > 0 {
        return Err(MatchingError::invalid_input(format!(
            "{name} column contains {} null labels",
            col.null_count()
        )));
    }

    match col.data_type() {
        DataType::Boolean => {
            let flags = col
                .as_any()
                .downcast_ref::<BooleanArray>()
                .ok_or_else(|| {
                    MatchingError::invalid_input(format!("{name} column is not a boolean array"))
                })?;
            Ok(flags.values().iter().map(Group::from_flag).collect())
        }
        dt if dt.is_integer() => {
            let cast = compute::cast(col, &DataType::Int64)?;
            let labels = cast.as_any().downcast_ref::<Int64Array>().ok_or_else(|| {
                MatchingError::invalid_input(format!("{name} column is not an integer array"))
            })?;
            labels
                .values()
                .iter()
                .enumerate()
                .map(|(row, &label)| match label {
                    0 => Ok(Group::Control),
                    1 => Ok(Group::Treated),
                    other => Err(MatchingError::invalid_input(format!(
                        "{name} label {other} at row {row} is neither 0 nor 1"
                    ))),
                })
                .collect()
        }
        other => Err(MatchingError::invalid_input(format!(
            "{name} column has unsupported type {other}"
        ))),
    }
}
