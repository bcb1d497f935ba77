//! Error types for REDCap data ingestion.

use std::path::PathBuf;
use thiserror::Error;

use redcap_model::ModelError;

/// Errors that can occur while loading reference terms, snapshots or events.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Input file not found.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Parsing Errors ===
    /// Failed to parse CSV with Polars.
    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    /// Failed to parse an events payload as JSON.
    #[error("failed to parse JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // === Shape Errors ===
    /// Required column not present in an input table.
    #[error("required column '{column}' not found in {table}")]
    MissingColumn { column: String, table: String },

    /// Multi-instance payload does not have the record -> instance -> field shape.
    #[error("malformed multi-instance payload: {reason}")]
    EventShape { reason: String },

    /// Display terms could not be assembled into a dictionary.
    #[error(transparent)]
    Model(#[from] ModelError),

    // === DataFrame Errors ===
    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for IngestError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
