//! Crate-level error type.
//!
//! Only configuration errors and bulk I/O errors surface as phase failures.
//! Per-record parse failures are absorbed by the field parsers (the record is
//! skipped and a counter incremented) and never reach this type.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that terminate a pipeline phase.
#[derive(Error, Debug)]
pub enum Error {
    /// Bulk I/O failure on the dump or a prerequisite file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A recognised configuration key is absent or empty.
    #[error("missing configuration key '{0}'")]
    MissingKey(String),

    /// A configuration value failed to parse.
    #[error("invalid value '{value}' for configuration key '{key}'")]
    BadValue { key: String, value: String },

    /// The similarity weight triple does not sum to 1.
    #[error("similarity weights must sum to 1, got {0}")]
    BadWeights(f64),

    /// The worker pool failed to drain within the configured wait.
    #[error("worker pool failed to terminate within {0} ms")]
    ExecutorTimeout(u64),
}
