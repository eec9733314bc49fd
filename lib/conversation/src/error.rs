//! Error types for the conversation crate.

use chat_relay_core::ConversationId;
use std::fmt;

/// Errors from session operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No session exists for the conversation.
    NotFound { conversation: ConversationId },
    /// Session state lock was poisoned by a panicking writer.
    Poisoned,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { conversation } => {
                write!(f, "no session for conversation {conversation}")
            }
            Self::Poisoned => write!(f, "session store lock poisoned"),
        }
    }
}

impl std::error::Error for SessionError {}
