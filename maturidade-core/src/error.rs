//! Error types for maturidade-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the maturidade-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error (snapshot store or fact tables unavailable)
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A date or date range could not be parsed
    #[error("invalid date '{value}': {message}")]
    InvalidDate { value: String, message: String },

    /// Fact import failed for a file
    #[error("import error in {}: {message}", path.display())]
    Import { path: PathBuf, message: String },
}

/// Result type alias for maturidade-core
pub type Result<T> = std::result::Result<T, Error>;
