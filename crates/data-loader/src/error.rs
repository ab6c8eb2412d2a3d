//! Error types for the data-loader crate.
//!
//! Row-level problems in the dataset are not errors: they are logged and the
//! row is skipped (see `parser`). The variants here cover faults that stop a
//! load or a rating-store operation as a whole.

use thiserror::Error;

/// Errors that can occur while loading movies or managing user ratings
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading or writing a file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// File contents are not valid JSON, or not the expected shape
    #[error("Malformed JSON in {file}: {reason}")]
    MalformedFile { file: String, reason: String },

    /// A data field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// A user rating outside the accepted range
    #[error("Rating {score} is outside the accepted range {min}..={max}")]
    InvalidRating { score: f32, min: f32, max: f32 },

    /// Data validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Type alias for Results using our error type
pub type Result<T> = std::result::Result<T, DataLoadError>;
