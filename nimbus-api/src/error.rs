//! Client error types.

use thiserror::Error;

use crate::resource::ResourceKind;

/// Errors that can occur talking to the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Direct get for a uuid the remote side does not know.
    #[error("{kind} {uuid} not found")]
    NotFound { kind: ResourceKind, uuid: String },

    /// Any other failure signaled by the remote API.
    #[error("remote API error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// Request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response payload was missing required fields.
    #[error("unexpected payload: {0}")]
    Decode(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;
