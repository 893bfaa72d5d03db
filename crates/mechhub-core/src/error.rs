//! Error types for the Mechanic Hub core library.

use thiserror::Error;

use crate::db::DatabaseError;

/// Result type alias using the core `Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for Mechanic Hub operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input, recoverable by correcting it.
    #[error("Validation error: {0}")]
    Validation(String),

    /// State machine violation (wrong state or wrong actor).
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Mechanic already holds a live offer on the request.
    #[error("Mechanic {mechanic_id} already has an offer on request {request_id}")]
    DuplicateOffer {
        request_id: String,
        mechanic_id: String,
    },

    /// Transport failure talking to the backend.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a body of the wrong shape.
    #[error("Unexpected response from server: {0}")]
    UnexpectedResponse(String),

    /// Local storage error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether retrying the same action may succeed without user changes.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
