//! Error types for the slim API client.
//!
//! # Design
//! Non-2xx responses are surfaced unchanged in `HttpError` with the raw status
//! and body. Application-level failures (a 2xx response whose envelope carries
//! a non-success `code`) are not errors here; callers inspect
//! `ApiResponse::code` for those.

use std::io;

/// Errors returned by the requester and its resource clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The backend never produced a response (connect failure, timeout, ...).
    #[error("transport failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// The response body was not a valid `{code, data, msg}` envelope.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// A filter was built from a value that is neither a key list nor a transform.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("token storage I/O failed: {0}")]
    Storage(#[from] io::Error),

    #[error("token storage is corrupt: {0}")]
    StorageFormat(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status of the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
