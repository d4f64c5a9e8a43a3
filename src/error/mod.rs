//! Error handling for propensity score matching.

use arrow::error::ArrowError;

/// Errors that can occur while preparing or running a matching call
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    /// Arrow error
    #[error("Arrow error: {0}")]
    ArrowError(#[from] ArrowError),

    /// Input population violates a precondition (non-finite scores, bad labels, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A configured column is absent from the input batch
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Scores are absent and no scoring provider was supplied
    #[error("Missing scores: {0}")]
    MissingScores(String),

    /// The injected scoring provider failed
    #[error("Scoring error: {0}")]
    ScoringError(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error parsing a JSON configuration
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error reading a configuration file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MatchingError {
    /// Shorthand for an `InvalidInput` error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Result type for matching operations
pub type Result<T> = std::result::Result<T, MatchingError>;
