//! Error types for the mapty_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for mapty_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad user input; nothing was changed
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Unusable argument such as an unknown workout type; nothing was changed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No workout with the given id
    #[error("Workout not found: {0}")]
    NotFound(String),

    /// A workout with the given id is already in the store
    #[error("Duplicate workout id: {0}")]
    DuplicateId(String),

    /// Persisted data could not be revived
    #[error("Corrupt storage: {0}")]
    CorruptStorage(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reverse geocoding or flag lookup failed
    #[error("Geocoding error: {0}")]
    Geocoding(String),

    /// Edit session used out of order
    #[error("State error: {0}")]
    State(String),
}

impl Error {
    /// True for errors caused by user input rather than a broken invariant.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::InvalidArgument(_))
    }
}
