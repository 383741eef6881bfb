use thiserror::Error;

/// Validation and contract errors exposed by `tidecast-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("horizon must be between 1 and {max}, got {value}")]
    InvalidHorizon { value: usize, max: usize },
    #[error("alpha must be strictly between 0 and 1, got {value}")]
    InvalidAlpha { value: String },
    #[error("frequency cannot be empty")]
    EmptyFrequency,
    #[error("floor must be finite")]
    NonFiniteFloor,

    #[error("exogenous column '{column}' has {actual} values, expected {expected}")]
    MapColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("exogenous matrix has {actual} rows, expected {expected}")]
    MatrixRowCount { expected: usize, actual: usize },
    #[error("exogenous matrix row {row} has {actual} values, expected {expected}")]
    MatrixRowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("date must be yyyy-MM-dd: '{value}'")]
    InvalidDate { value: String },
    #[error("evaluation window start {start} is after end {end}")]
    InvertedWindow { start: String, end: String },

    #[error("unknown histogram mode '{value}', expected residual or absolute")]
    InvalidHistogramMode { value: String },
    #[error("unknown exogenous strategy '{value}', expected zero or smart")]
    InvalidStrategy { value: String },
}

/// Malformed CSV input rejected by [`crate::csv_codec::parse_strict`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CsvParseError {
    #[error("unterminated quoted field starting on line {line}")]
    UnterminatedQuote { line: usize },
}

/// Invalid client configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("api base must start with http:// or https://: '{value}'")]
    InvalidApiBase { value: String },
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
    #[error("environment variable {name} is not a valid number: '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Csv(#[from] CsvParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
