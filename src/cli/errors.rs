use std::path::PathBuf;

use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("No image files found in {dir:?}")]
    NoInputs { dir: PathBuf },

    #[error("No image could be processed ({errors} failed)")]
    NothingProcessed { errors: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Library(#[from] garmentprep::Error),

    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}
