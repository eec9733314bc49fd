//! Answer backend abstraction.
//!
//! Provides a unified interface over the language-model providers the relay
//! can answer with.

use crate::error::GenerationError;
use async_trait::async_trait;
use chat_relay_core::ConversationId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// System instruction used when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly assistant chatting with someone \
    over a messaging app. Answer in the language of the last message, keep replies short and \
    conversational, and use separate lines for separate thoughts.";

/// Which backend answers messages. Selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    /// OpenAI chat completions with per-conversation sessions.
    #[serde(rename = "GPT", alias = "gpt")]
    Gpt,
    /// Google Gemini, stateless.
    #[default]
    #[serde(rename = "GEMINI", alias = "gemini")]
    Gemini,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpt => f.write_str("GPT"),
            Self::Gemini => f.write_str("GEMINI"),
        }
    }
}

/// Trait for answer backends.
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    /// Generates a reply to `text` received in `conversation`.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport, status or response-format failure.
    /// Implementations never retry; that is the caller's job.
    async fn generate(
        &self,
        text: &str,
        conversation: &ConversationId,
    ) -> Result<String, GenerationError>;

    /// Returns the backend kind.
    fn kind(&self) -> BackendKind;

    /// Returns the model name.
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Selection {
        ai: BackendKind,
    }

    #[test]
    fn backend_kind_defaults_to_gemini() {
        assert_eq!(BackendKind::default(), BackendKind::Gemini);
    }

    #[test]
    fn backend_kind_parses_uppercase_names() {
        let parsed: Selection = serde_json::from_str(r#"{"ai": "GPT"}"#).expect("deserialize");
        assert_eq!(parsed.ai, BackendKind::Gpt);

        let parsed: Selection = serde_json::from_str(r#"{"ai": "gemini"}"#).expect("deserialize");
        assert_eq!(parsed.ai, BackendKind::Gemini);
    }

    #[test]
    fn backend_kind_rejects_unknown_names() {
        let parsed: Result<Selection, _> = serde_json::from_str(r#"{"ai": "LLAMA"}"#);
        assert!(parsed.is_err());
    }
}
