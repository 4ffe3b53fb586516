//! Error types for clinical data ingestion.
//!
//! Everything here is structural: a missing file, an unreadable table or a
//! missing required column stops the run. Per-row problems never surface as
//! an [`IngestError`]; they are recorded on the normalized output instead.

use std::path::PathBuf;
use thiserror::Error;

use cts_model::ModelError;

/// Errors that can occur during data ingestion operations.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Input file not found.
    #[error("input file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File uses an encoding the readers cannot handle.
    #[error("unsupported encoding {encoding} in {path}")]
    UnsupportedEncoding {
        path: PathBuf,
        encoding: &'static str,
    },

    // === CSV Parsing Errors ===
    /// Failed to parse CSV with Polars.
    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    /// CSV file has no header row.
    #[error("CSV file is empty: {path}")]
    EmptyCsv { path: PathBuf },

    // === Schema Errors ===
    /// Required column not found in an input table.
    #[error("required column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// Column not found in DataFrame.
    #[error("column '{column}' not found in DataFrame")]
    ColumnNotFound { column: String },

    // === DataFrame Errors ===
    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },

    // === Configuration Errors ===
    #[error("invalid input configuration: {0}")]
    Config(#[from] ModelError),

    /// An input path was required but not configured.
    #[error("no path configured for the {table} table")]
    PathNotConfigured { table: &'static str },
}

impl IngestError {
    /// Attaches a file path to a path-less column error.
    pub fn with_path(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Self::ColumnNotFound { column } => Self::MissingColumn {
                column,
                path: path.into(),
            },
            Self::DataFrame { message } => Self::CsvParse {
                path: path.into(),
                message,
            },
            other => other,
        }
    }
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
