//! Match assembly
//!
//! Accumulates matches with dense identifiers and resolves them back to the
//! rows of the input batch.

use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, UInt64Array};
use arrow::compute;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::algorithm::matching::types::{Match, MatchSet, RowId};
use crate::error::{MatchingError, Result};

/// Name of the output column holding the match identifier
pub const MATCH_ID_COLUMN: &str = "match_id";

/// Name of the output column holding the original row identity
pub const RECORD_ID_COLUMN: &str = "record_id";

/// Accumulates matches for a single matching call
#[derive(Debug, Default)]
pub struct MatchAssembler {
    matches: Vec<Match>,
}

impl MatchAssembler {
    /// Create an assembler expecting roughly `capacity` matches
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            matches: Vec::with_capacity(capacity),
        }
    }

    /// Record a treated anchor and its neighbours; returns the new match id
    pub fn push<I>(&mut self, treated: RowId, controls: I) -> usize
    where
        I: IntoIterator<Item = RowId>,
    {
        let match_id = self.matches.len();
        self.matches.push(Match {
            match_id,
            treated,
            controls: controls.into_iter().collect(),
        });
        match_id
    }

    /// Number of matches recorded so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Finish the call and hand out the matches
    #[must_use]
    pub fn finish(self) -> MatchSet {
        MatchSet::from_matches(self.matches)
    }
}

/// Gather every matched row of `batch` and tag it with `match_id` and `record_id`
///
/// Rows appear in [`MatchSet::rows`] order; a control chosen by several
/// matches appears once per match. `record_id` is taken from `identity` when
/// given, otherwise it is the input row position.
///
/// # Errors
/// Returns an error if `batch` already has an output column, the identity
/// column is missing, or a row is out of range
pub fn build_matched_batch(
    batch: &RecordBatch,
    matches: &MatchSet,
    identity: Option<&str>,
) -> Result<RecordBatch> {
    for name in [MATCH_ID_COLUMN, RECORD_ID_COLUMN] {
        if batch.schema().index_of(name).is_ok() {
            return Err(MatchingError::invalid_input(format!(
                "input already contains output column {name}"
            )));
        }
    }

    let rows = matches.rows();
    if let Some((_, row)) = rows.iter().find(|(_, row)| row.0 >= batch.num_rows()) {
        return Err(MatchingError::invalid_input(format!(
            "Index out of bounds: {} >= {}",
            row.0,
            batch.num_rows()
        )));
    }

    let indices = UInt64Array::from_iter_values(rows.iter().map(|(_, row)| row.0 as u64));
    let match_ids = Int64Array::from_iter_values(rows.iter().map(|&(id, _)| id as i64));

    let gathered = compute::take_record_batch(batch, &indices)?;

    let (record_ids, record_field): (ArrayRef, Field) = match identity {
        Some(name) => {
            let schema = batch.schema();
            let idx = schema
                .index_of(name)
                .map_err(|_| MatchingError::MissingColumn(format!("{name} column not found")))?;
            let field = schema.field(idx);
            (
                compute::take(batch.column(idx).as_ref(), &indices, None)?,
                Field::new(RECORD_ID_COLUMN, field.data_type().clone(), field.is_nullable()),
            )
        }
        None => (
            Arc::new(indices.clone()) as ArrayRef,
            Field::new(RECORD_ID_COLUMN, DataType::UInt64, false),
        ),
    };

    let mut fields: Vec<Field> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    fields.push(Field::new(MATCH_ID_COLUMN, DataType::Int64, false));
    fields.push(record_field);

    let mut columns = gathered.columns().to_vec();
    columns.push(Arc::new(match_ids));
    columns.push(record_ids);

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}
