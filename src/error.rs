//! Typed errors surfaced by the library.

use thiserror::Error;

/// Failures while fetching or decoding the crash record set.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Warehouse returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Query job {0} did not complete")]
    Incomplete(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of a severity prediction request.
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model returned an unexpected label: {0}")]
    UnexpectedLabel(String),

    #[error("Model returned no prediction")]
    EmptyResult,

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Invalid filter input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("Year range {min}..{max} is inverted")]
    InvertedYearRange { min: i32, max: i32 },

    #[error("Invalid year: {0}")]
    InvalidYear(String),

    #[error("Unknown severity '{0}' (expected all, fatal or non-fatal)")]
    UnknownSeverity(String),

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),
}

/// Missing or malformed configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Failed to read credentials file {path}: {reason}")]
    Credentials { path: String, reason: String },
}
