//! Error types for health-days

use thiserror::Error;

/// Errors that can occur while loading, querying or encoding health samples.
///
/// The aggregator itself never fails; these cover everything around it.
#[derive(Debug, Error)]
pub enum HealthError {
    #[error("Failed to parse sample payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Sample source failed: {0}")]
    SourceError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

/// Record-level validation failures for `health.sample.v1` input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Interval ends before it starts: start {start}, end {end}")]
    InvertedInterval { start: String, end: String },

    #[error("Invalid quantity {value} for category {category}")]
    InvalidQuantity { category: String, value: f64 },

    #[error("Category {0} does not carry a quantity")]
    UnexpectedQuantity(String),
}
