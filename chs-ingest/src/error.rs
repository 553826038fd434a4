//! Error types for chs-ingest
//!
//! Fetch errors carry their retry classification; run-level errors end up as
//! the `error` text of a `Failed` run.

use chs_common::events::RunStatus;
use thiserror::Error;

/// Archive fetch failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Non-success HTTP status other than 429
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// HTTP 429
    #[error("Rate limited by {url}")]
    RateLimited { url: String },

    /// Connection could not be established
    #[error("Connect failed for {url}: {message}")]
    Connect { url: String, message: String },

    /// Connect or read timeout elapsed
    #[error("Timed out fetching {url}")]
    Timeout { url: String },

    /// Response arrived but could not be interpreted
    #[error("Malformed response from {url}: {message}")]
    Malformed { url: String, message: String },
}

impl FetchError {
    /// Transient failures worth another attempt: 5xx, 429, connect errors, timeouts
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => (500..600).contains(status),
            FetchError::RateLimited { .. }
            | FetchError::Connect { .. }
            | FetchError::Timeout { .. } => true,
            FetchError::Malformed { .. } => false,
        }
    }

    /// Map an HTTP status to an error (None for success)
    pub fn from_status(status: u16, url: &str) -> Option<FetchError> {
        match status {
            200..=299 => None,
            429 => Some(FetchError::RateLimited {
                url: url.to_string(),
            }),
            _ => Some(FetchError::Status {
                status,
                url: url.to_string(),
            }),
        }
    }
}

/// Run-level failure
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Store failed: {0}")]
    Store(#[from] chs_common::Error),

    #[error("Invalid run transition {from} -> {to}")]
    InvalidTransition { from: RunStatus, to: RunStatus },

    /// Rejected before a run was created
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;
