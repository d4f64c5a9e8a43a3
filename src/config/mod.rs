//! Configuration for propensity score matching.
//!
//! The configuration selects the matching algorithm, the number of neighbours
//! requested per treated record, the replacement policy and the column names
//! used to read a population from an Arrow `RecordBatch`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MatchingError, Result};

/// Nearest-neighbour algorithm used to pair treated records with controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingMethod {
    /// Single scan over the whole population, matching each treated run
    /// against the control runs directly bracketing it
    #[default]
    Interval,
    /// Per-treated binary search over the sorted controls
    BinarySearch,
    /// Two-pointer merge of sorted treated records against sorted controls
    MergeScan,
}

impl MatchingMethod {
    /// All available methods
    pub const ALL: [Self; 3] = [Self::Interval, Self::BinarySearch, Self::MergeScan];

    /// Canonical name of the method
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::BinarySearch => "binary_search",
            Self::MergeScan => "merge_scan",
        }
    }
}

impl fmt::Display for MatchingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MatchingMethod {
    type Err = MatchingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interval" | "nnm" => Ok(Self::Interval),
            "binary_search" | "binary-search" | "bs" => Ok(Self::BinarySearch),
            "merge_scan" | "merge-scan" | "merge" => Ok(Self::MergeScan),
            other => Err(MatchingError::ConfigError(format!(
                "Unknown matching method: {other}"
            ))),
        }
    }
}

/// Names of the columns read from the input batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    /// Boolean (or 0/1 integer) column flagging treated records
    pub treatment: String,
    /// Propensity score column
    pub score: String,
    /// Optional column whose values label output rows as `record_id`
    pub identity: Option<String>,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            treatment: "treatment".to_string(),
            score: "scores".to_string(),
            identity: None,
        }
    }
}

/// Configuration for a matching call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Algorithm to run
    pub method: MatchingMethod,

    /// Number of control neighbours requested per treated record
    pub nmatches: usize,

    /// Whether one control may be reused by several matches
    pub with_replacement: bool,

    /// Whether the binary search locator may answer queries in parallel
    pub use_parallel: bool,

    /// Whether to draw progress bars
    pub show_progress: bool,

    /// Input column names
    pub columns: ColumnConfig,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            method: MatchingMethod::default(),
            nmatches: 1,
            with_replacement: true,
            use_parallel: false,
            show_progress: false,
            columns: ColumnConfig::default(),
        }
    }
}

impl MatchingConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new builder for constructing matching configuration
    #[must_use]
    pub fn builder() -> MatchingConfigBuilder {
        MatchingConfigBuilder::new()
    }

    /// Parse a configuration from a JSON string; absent fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Check that the configuration can drive a matching call
    ///
    /// # Errors
    /// Returns `ConfigError` when `nmatches` is zero or a column name is empty
    pub fn validate(&self) -> Result<()> {
        if self.nmatches == 0 {
            return Err(MatchingError::ConfigError(
                "nmatches must be at least 1".to_string(),
            ));
        }
        if self.columns.treatment.is_empty() || self.columns.score.is_empty() {
            return Err(MatchingError::ConfigError(
                "treatment and score column names must not be empty".to_string(),
            ));
        }
        if self.columns.identity.as_deref() == Some("") {
            return Err(MatchingError::ConfigError(
                "identity column name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for MatchingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matching Configuration:")?;
        writeln!(f, "  Method: {}", self.method)?;
        writeln!(f, "  Neighbours per treated: {}", self.nmatches)?;
        writeln!(f, "  With replacement: {}", self.with_replacement)?;
        writeln!(f, "  Parallel: {}", self.use_parallel)?;
        writeln!(f, "  Treatment column: {}", self.columns.treatment)?;
        writeln!(f, "  Score column: {}", self.columns.score)?;
        if let Some(identity) = &self.columns.identity {
            writeln!(f, "  Identity column: {identity}")?;
        }
        Ok(())
    }
}

/// Builder for constructing matching configuration
#[derive(Debug, Clone)]
pub struct MatchingConfigBuilder {
    config: MatchingConfig,
}

impl Default for MatchingConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingConfigBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: MatchingConfig::default(),
        }
    }

    /// Set the matching method
    #[must_use]
    pub const fn method(mut self, method: MatchingMethod) -> Self {
        self.config.method = method;
        self
    }

    /// Set the number of neighbours per treated record
    #[must_use]
    pub const fn nmatches(mut self, nmatches: usize) -> Self {
        self.config.nmatches = nmatches;
        self
    }

    /// Set whether controls may be reused
    #[must_use]
    pub const fn with_replacement(mut self, replacement: bool) -> Self {
        self.config.with_replacement = replacement;
        self
    }

    /// Set whether to use parallel processing
    #[must_use]
    pub const fn use_parallel(mut self, parallel: bool) -> Self {
        self.config.use_parallel = parallel;
        self
    }

    /// Set whether to draw progress bars
    #[must_use]
    pub const fn show_progress(mut self, show: bool) -> Self {
        self.config.show_progress = show;
        self
    }

    /// Set the treatment column name
    #[must_use]
    pub fn treatment_column(mut self, name: impl Into<String>) -> Self {
        self.config.columns.treatment = name.into();
        self
    }

    /// Set the score column name
    #[must_use]
    pub fn score_column(mut self, name: impl Into<String>) -> Self {
        self.config.columns.score = name.into();
        self
    }

    /// Set the identity column name
    #[must_use]
    pub fn identity_column(mut self, name: impl Into<String>) -> Self {
        self.config.columns.identity = Some(name.into());
        self
    }

    /// Build the matching configuration
    #[must_use]
    pub fn build(self) -> MatchingConfig {
        self.config
    }
}
