use thiserror::Error;

use crate::batch::AlignmentError;
use crate::method::Method;
use crate::types::ErrorBody;

/// The HTTP exchange itself failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request never produced a response (connect, TLS, timeout, ...).
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP status {status}{}", .status_text.as_ref().map(|t| format!(" {t}")).unwrap_or_default())]
    Status {
        status: u16,
        status_text: Option<String>,
    },
}

/// The server answered but its envelope carried an `error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("API error {code} on {path}: {message}")]
pub struct ApiError {
    pub code: u32,
    pub message: String,
    /// Request path that produced the error, e.g. `/subscribe`.
    pub path: String,
}

impl ApiError {
    pub fn from_body(body: ErrorBody, path: impl Into<String>) -> Self {
        Self {
            code: body.code,
            message: body.message,
            path: path.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Invalid response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Batch reply for {found:?} where {expected} was expected")]
    UnexpectedReply {
        expected: Method,
        found: Option<Method>,
    },

    #[error(transparent)]
    Alignment(#[from] AlignmentError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status for [`TransportError::Status`] failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transport(TransportError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// Remote error code for envelope errors.
    pub fn api_code(&self) -> Option<u32> {
        match self {
            Error::Api(e) => Some(e.code),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    pub fn is_api(&self) -> bool {
        matches!(self, Error::Api(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
