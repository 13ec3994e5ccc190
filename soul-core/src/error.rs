//! Error types for the soul core library.

use thiserror::Error;

/// Top-level error type for state, memory and persistence operations.
#[derive(Error, Debug)]
pub enum SoulError {
    /// The snapshot store could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for SoulError {
    fn from(err: serde_json::Error) -> Self {
        SoulError::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, SoulError>;
