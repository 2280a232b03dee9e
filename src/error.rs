//! Error types for each component boundary.
//!
//! Fetch and store failures are usually absorbed by the sync loop with
//! degraded behavior; only [`SyncError`] aborts a run.

use thiserror::Error;

/// Errors reaching or reading the remote status endpoint.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Remote returned HTTP {0}")]
    Status(u16),
    #[error("Remote reported failure: {0}")]
    Rejected(String),
    #[error("Invalid response envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

/// A single remote record that could not be turned into a `StatusRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("invalid value for '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Errors from the destination store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Insert error: {0}")]
    Insert(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        StoreError::Query(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Fatal errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Cannot connect to destination store: {0}")]
    Connection(#[source] StoreError),
}
