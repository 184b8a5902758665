//! Error types for mcgrp-output.

use thiserror::Error;

use mcgrp_editor::EditError;

/// Errors that can occur when writing instances or snapshots.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// The state could not be re-indexed before writing.
    #[error("cannot prepare instance: {0}")]
    Edit(#[from] EditError),

    #[error("invalid instance name {0:?}")]
    InvalidName(String),
}

/// Alias for `Result<T, OutputError>`.
pub type OutputResult<T> = Result<T, OutputError>;
