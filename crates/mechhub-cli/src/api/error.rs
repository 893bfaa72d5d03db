//! Backend API errors and their mapping onto the core error taxonomy.

use thiserror::Error;

use mechhub_core::Error as CoreError;

/// API client errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Mechanic {mechanic_id} already sent an offer on request {request_id}")]
    DuplicateOffer {
        request_id: String,
        mechanic_id: String,
    },

    #[error("Not authorized: {message}")]
    Unauthorized { message: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Classify a non-success response.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 | 422 => Self::Validation { message },
            401 | 403 => Self::Unauthorized { message },
            404 => Self::NotFound { message },
            409 => Self::Conflict { message },
            _ => Self::Api { status, message },
        }
    }

    /// Read a response body error: malformed JSON is `Decode`, anything
    /// else happened on the wire.
    pub fn from_body(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err)
        }
    }

    /// Transport failures and server-side errors; worth trying again.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Re-read a conflict on offer submission as a duplicate when the
    /// backend says the mechanic already bid.
    #[must_use]
    pub fn into_duplicate_offer(self, request_id: &str, mechanic_id: &str) -> Self {
        match self {
            Self::Conflict { message } | Self::Validation { message }
                if message.to_ascii_lowercase().contains("already") =>
            {
                Self::DuplicateOffer {
                    request_id: request_id.to_string(),
                    mechanic_id: mechanic_id.to_string(),
                }
            }
            other => other,
        }
    }
}

impl From<ApiError> for CoreError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Http(e) => Self::Network(e.to_string()),
            ApiError::Decode(msg) => Self::UnexpectedResponse(msg),
            ApiError::Validation { message } => Self::Validation(message),
            ApiError::NotFound { message } => Self::NotFound(message),
            ApiError::Conflict { message } => Self::InvalidTransition(message),
            ApiError::DuplicateOffer {
                request_id,
                mechanic_id,
            } => Self::DuplicateOffer {
                request_id,
                mechanic_id,
            },
            ApiError::Unauthorized { message } => {
                Self::Validation(format!("{message}. Log in again"))
            }
            ApiError::Api { status, message } if status >= 500 => {
                Self::Network(format!("Server error ({status}): {message}"))
            }
            ApiError::Api { status, message } => {
                Self::Validation(format!("Request rejected ({status}): {message}"))
            }
            ApiError::Config(msg) => Self::Config(msg),
        }
    }
}
