use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy surfaced to callers.
///
/// Validation failures never reach the network. Remote failures keep the
/// status code and response body so presentation can show the detail; the
/// orchestrator only ever branches on the kind, never the text.
#[derive(Debug, Error)]
pub enum Error {
    #[error("task title cannot be empty")]
    EmptyTitle,

    #[error("task {id} not found")]
    NotFound { id: String },

    #[error("service returned {status}: {body}")]
    Remote { status: StatusCode, body: String },

    #[error("network error: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },
}

impl Error {
    /// True for failures rejected before any request was issued.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::EmptyTitle)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Remote { status, .. } if *status == StatusCode::CONFLICT)
    }
}
