//! Oemfield: extraction of state vectors from CCSDS Orbit Ephemeris Messages
//!
//! This crate reads the data section of OEM text files (the rows between
//! `META_STOP` and `COVARIANCE_START`), normalizes each row's epoch and
//! collects `epoch + [x, y, z]` records from any number of files into a single
//! JSON document.
//!
//! # Main Components
//!
//! - `time`: epoch normalization
//! - `oem`: record types and the section parser
//! - `batch`: directory listing, multi-file aggregation and output

use std::path::PathBuf;
use thiserror::Error;

pub mod batch;
pub mod oem;
pub mod time;

// Re-export commonly used types
pub use batch::{aggregate, Aggregator, BatchConfig, BatchSummary, CancelToken, FileSummary};
pub use oem::{parse_section, SkipPolicy, TelemetryBatch, TelemetryRecord};
pub use time::normalize_epoch;

/// Main error type for the oemfield library
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A file or directory could not be opened, read or written
    #[error("File I/O error on {path:?}: {source}")]
    FileError {
        /// The path of the file that caused the error
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A data line rejected under [`SkipPolicy::Strict`]
    #[error("Malformed data line {line_number}{}: {content:?}", location(.path))]
    MalformedLine {
        path: Option<PathBuf>,
        line_number: usize,
        content: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Batch cancelled after {files_processed} files")]
    Cancelled { files_processed: usize },
}

impl TelemetryError {
    /// Attach the file being parsed to errors that lack one
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            TelemetryError::IoError(source) => TelemetryError::FileError {
                path: path.into(),
                source,
            },
            TelemetryError::MalformedLine {
                path: None,
                line_number,
                content,
            } => TelemetryError::MalformedLine {
                path: Some(path.into()),
                line_number,
                content,
            },
            other => other,
        }
    }
}

fn location(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" in {}", path.display()),
        None => String::new(),
    }
}

/// Result type for oemfield operations
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Helper function to convert a std::io::Error to TelemetryError
pub fn io_err(path: impl Into<PathBuf>, err: std::io::Error) -> TelemetryError {
    TelemetryError::FileError {
        path: path.into(),
        source: err,
    }
}
