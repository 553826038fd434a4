//! Common error types for the chess-data ingest workspace

use thiserror::Error;

/// Common result type for chs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the ingest service and its stores
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the error is a uniqueness-constraint violation reported by the database.
    ///
    /// Used by the game store to treat a racing duplicate insert as "already ingested".
    pub fn is_unique_violation(&self) -> bool {
        match self {
            #[cfg(feature = "sqlx")]
            Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(format!("JSON serialization failed: {}", err))
    }
}
