//! Startup error types for the relay binary.
//!
//! Everything here is fatal: once the relay is serving, failures are logged
//! and recovered inside the pipeline instead.

use std::fmt;

/// Configuration errors detected while loading or validating settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The environment could not be read or deserialized.
    Load { reason: String },
    /// A required credential is absent or blank.
    MissingCredential {
        variable: &'static str,
        purpose: &'static str,
    },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { reason } => write!(f, "failed to load configuration: {reason}"),
            Self::MissingCredential { variable, purpose } => {
                write!(f, "{variable} must be set ({purpose})")
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Errors bringing the relay up or keeping the listener running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServeError {
    /// Configuration was rejected.
    Configuration { reason: String },
    /// The shared HTTP client could not be built.
    HttpClient { reason: String },
    /// The webhook listener could not bind.
    Bind { addr: String, reason: String },
    /// The webhook server stopped with an error.
    Server { reason: String },
}

impl fmt::Display for ServeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { reason } => write!(f, "invalid configuration: {reason}"),
            Self::HttpClient { reason } => write!(f, "failed to build HTTP client: {reason}"),
            Self::Bind { addr, reason } => write!(f, "failed to bind {addr}: {reason}"),
            Self::Server { reason } => write!(f, "webhook server error: {reason}"),
        }
    }
}

impl std::error::Error for ServeError {}

impl From<ConfigurationError> for ServeError {
    fn from(error: ConfigurationError) -> Self {
        Self::Configuration {
            reason: error.to_string(),
        }
    }
}
