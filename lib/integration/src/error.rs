//! Error types for the integration crate.
//!
//! - `MessagingError`: transport failures talking to the messaging gateway
//! - `TranscriptionError`: failures turning a voice note into text
//! - `DeliveryError`: failures sending a reply batch

use std::fmt;

/// Errors from messaging gateway operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagingError {
    /// The request could not be sent.
    RequestFailed { operation: String, reason: String },
    /// The gateway answered with a non-success status.
    Status {
        operation: String,
        status: u16,
        body: String,
    },
    /// Timeout waiting for the gateway.
    Timeout { operation: String },
}

impl MessagingError {
    pub(crate) fn transport(operation: &str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                operation: operation.to_string(),
            }
        } else {
            Self::RequestFailed {
                operation: operation.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

impl fmt::Display for MessagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { operation, reason } => {
                write!(f, "gateway {operation} failed: {reason}")
            }
            Self::Status {
                operation,
                status,
                body,
            } => {
                write!(f, "gateway {operation} returned HTTP {status}: {body}")
            }
            Self::Timeout { operation } => write!(f, "gateway {operation} timed out"),
        }
    }
}

impl std::error::Error for MessagingError {}

/// Errors from voice transcription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionError {
    /// The audio could not be downloaded from the messaging client.
    Download { reason: String },
    /// The staging file could not be written or read.
    Staging { path: String, reason: String },
    /// The speech-to-text request could not be sent.
    RequestFailed { reason: String },
    /// The speech-to-text service answered with a non-success status.
    Status { status: u16, body: String },
    /// The service response could not be interpreted.
    ResponseParseFailed { reason: String },
    /// The service returned no text.
    EmptyTranscript,
}

impl fmt::Display for TranscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Download { reason } => write!(f, "failed to download voice note: {reason}"),
            Self::Staging { path, reason } => {
                write!(f, "failed to stage audio at {path}: {reason}")
            }
            Self::RequestFailed { reason } => {
                write!(f, "transcription request failed: {reason}")
            }
            Self::Status { status, body } => {
                write!(f, "transcription service returned HTTP {status}: {body}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse transcription response: {reason}")
            }
            Self::EmptyTranscript => write!(f, "transcription service returned no text"),
        }
    }
}

impl std::error::Error for TranscriptionError {}

/// Errors from reply delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Sending one chunk of the batch failed; later chunks were not sent.
    SendFailed {
        index: usize,
        total: usize,
        reason: String,
    },
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendFailed {
                index,
                total,
                reason,
            } => {
                write!(f, "failed to send message {} of {total}: {reason}", index + 1)
            }
        }
    }
}

impl std::error::Error for DeliveryError {}
