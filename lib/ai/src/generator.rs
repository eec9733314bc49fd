//! Startup-selected answer generator.

use crate::backend::{AnswerBackend, BackendKind};
use crate::error::GenerationError;
use crate::gemini::GeminiBackend;
use crate::openai::OpenAiSessionBackend;
use async_trait::async_trait;
use chat_relay_core::ConversationId;

/// The backend chosen at startup.
///
/// The variant is fixed for the lifetime of the process, so dispatch is a
/// plain match rather than a trait object.
#[derive(Debug)]
pub enum AnswerGenerator {
    /// OpenAI with per-conversation sessions.
    Session(OpenAiSessionBackend),
    /// Gemini without sessions.
    Stateless(GeminiBackend),
}

impl From<OpenAiSessionBackend> for AnswerGenerator {
    fn from(backend: OpenAiSessionBackend) -> Self {
        Self::Session(backend)
    }
}

impl From<GeminiBackend> for AnswerGenerator {
    fn from(backend: GeminiBackend) -> Self {
        Self::Stateless(backend)
    }
}

#[async_trait]
impl AnswerBackend for AnswerGenerator {
    async fn generate(
        &self,
        text: &str,
        conversation: &ConversationId,
    ) -> Result<String, GenerationError> {
        match self {
            Self::Session(backend) => backend.generate(text, conversation).await,
            Self::Stateless(backend) => backend.generate(text, conversation).await,
        }
    }

    fn kind(&self) -> BackendKind {
        match self {
            Self::Session(backend) => backend.kind(),
            Self::Stateless(backend) => backend.kind(),
        }
    }

    fn model(&self) -> &str {
        match self {
            Self::Session(backend) => backend.model(),
            Self::Stateless(backend) => backend.model(),
        }
    }
}
