//! Error types for the AI crate.
//!
//! Backends return `GenerationError` directly; the retry layer surfaces the
//! terminal failure as a rootcause `Report<GenerationError>`.

use std::fmt;

/// Errors from answer generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The request could not be sent or the connection failed.
    RequestFailed { backend: String, reason: String },
    /// The backend answered with a non-success status.
    Status {
        backend: String,
        status: u16,
        body: String,
    },
    /// The response body could not be interpreted.
    ResponseParseFailed { backend: String, reason: String },
    /// Timeout waiting for a response.
    Timeout { backend: String },
    /// The conversation session could not be used.
    Session { reason: String },
}

impl GenerationError {
    /// Maps a transport error from `reqwest`.
    pub(crate) fn transport(backend: &str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                backend: backend.to_string(),
            }
        } else {
            Self::RequestFailed {
                backend: backend.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { backend, reason } => {
                write!(f, "{backend} request failed: {reason}")
            }
            Self::Status {
                backend,
                status,
                body,
            } => {
                write!(f, "{backend} returned HTTP {status}: {body}")
            }
            Self::ResponseParseFailed { backend, reason } => {
                write!(f, "failed to parse {backend} response: {reason}")
            }
            Self::Timeout { backend } => write!(f, "{backend} request timed out"),
            Self::Session { reason } => write!(f, "chat session unavailable: {reason}"),
        }
    }
}

impl std::error::Error for GenerationError {}
