//! Error types for lexfed.

use thiserror::Error;

/// Result type alias for lexfed operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in lexfed operations.
#[derive(Error, Debug)]
pub enum Error {
    // Registry errors
    #[error("Module name already registered: {0}")]
    DuplicateName(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    // Data errors
    #[error("No datasets could be loaded for refs: {0}")]
    DataUnavailable(String),

    // Aggregation errors
    #[error("Parameter schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    // Validation errors
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    // Training errors
    #[error("Training failed for module {name}: {reason}")]
    TrainingFailed { name: String, reason: String },

    // Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}
