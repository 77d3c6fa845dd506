//! Error types for the Scrapyd API client.
//!
//! # Design
//! Failures fall into three kinds. Configuration errors (an unknown endpoint
//! or an unusable target) are raised before any request leaves the process.
//! Response errors cover everything the service sent back that is not a
//! successful envelope. Transport errors come from the HTTP layer itself and
//! carry the underlying error as their `source`.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Detail used when an error envelope arrives without a `message`.
pub const DEFAULT_RESPONSE_DETAIL: &str = "Scrapyd Response Error";

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Response,
    Transport,
}

/// Errors returned by the transport adapter and the API façade.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested operation has no entry in the endpoint table.
    #[error("Unknown endpoint `{0}`")]
    UnknownEndpoint(String),

    /// The target, or the target joined with an endpoint path, is not a URL.
    #[error("invalid target `{target}`: {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: url::ParseError,
    },

    /// The service answered with a non-2xx status.
    #[error("Scrapyd returned a {status} error: {body}")]
    HttpStatus { status: u16, body: String },

    /// The body of a 2xx response is not JSON.
    #[error("Scrapyd returned an invalid JSON response: {body}")]
    InvalidJson { body: String },

    /// The envelope reported `status: "error"`.
    #[error("{message}")]
    Server { message: String },

    /// The envelope was well-formed JSON but not the shape the operation expects.
    #[error("Scrapyd returned an unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The request exceeded the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Any other failure reported by the HTTP transport.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::UnknownEndpoint(_) | ApiError::InvalidTarget { .. } => ErrorKind::Configuration,
            ApiError::HttpStatus { .. }
            | ApiError::InvalidJson { .. }
            | ApiError::Server { .. }
            | ApiError::UnexpectedResponse(_) => ErrorKind::Response,
            ApiError::Timeout(_) | ApiError::Transport(_) => ErrorKind::Transport,
        }
    }

    /// True for every failure the service itself produced.
    pub fn is_response_error(&self) -> bool {
        self.kind() == ErrorKind::Response
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout(_))
    }
}
