//! Error types for the churn core

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A single field that failed a structural constraint in one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    /// Zero-based position of the record in the submitted batch
    pub record: usize,
    pub field: String,
    pub message: String,
}

/// Errors that can occur while fitting, persisting or replaying a pipeline
#[derive(Error, Debug)]
pub enum ChurnError {
    /// Feature set empty, label column missing, or matrix/schema disagreement
    #[error("Schema error: {0}")]
    Schema(String),

    /// Replay attempted before the transform was fitted
    #[error("Column mismatch: {0}")]
    ColumnMismatch(String),

    /// One or more records violate a field constraint
    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(Vec<FieldViolation>),

    /// An upstream file did not appear within the bounded wait
    #[error("Upstream file {} not ready after {:?}", .path.display(), .waited)]
    UpstreamNotReady { path: PathBuf, waited: Duration },

    /// Label value outside the binary vocabulary
    #[error("Invalid label {value:?} at row {row}")]
    InvalidLabel { row: usize, value: String },

    /// Scorer rejected its input
    #[error("Scorer error: {0}")]
    Scorer(String),

    /// Artifact bytes do not match their recorded digest
    #[error("Artifact integrity check failed: {0}")]
    ArtifactIntegrity(String),

    /// Pipeline handle has not finished loading
    #[error("Pipeline not ready")]
    NotReady,

    /// Malformed raw source
    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Result type for churn core operations
pub type Result<T> = std::result::Result<T, ChurnError>;
