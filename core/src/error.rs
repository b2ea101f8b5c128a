//! Error types for the showtrack client core.
//!
//! # Design
//! Transport failures (DNS, refused connections, timeouts) and HTTP failures
//! (the server answered with a non-2xx status) are separate variants so a
//! caller can tell "the API is unreachable" apart from "the API said no".
//! `ApiError` is `Clone` because components keep the last failure in their
//! observable state; variants therefore carry rendered messages rather than
//! the source error values.

use thiserror::Error;

/// A network-level failure raised by a [`Transport`](crate::Transport).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Errors returned by the request client and the components built on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server returned a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The response body could not be decoded into the expected shape.
    #[error("malformed response: {0}")]
    Parse(String),

    /// A client-side precondition was violated; no request was sent.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub(crate) fn auth_required() -> Self {
        ApiError::Validation("authentication required".to_string())
    }
}
