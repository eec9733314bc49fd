//! OpenAI chat-completions backend.
//!
//! Keeps a named session per conversation: before each call the session is
//! created or reused, and its recent history is sent along with the new text.

use crate::backend::{AnswerBackend, BackendKind};
use crate::error::GenerationError;
use async_trait::async_trait;
use chat_relay_conversation::{ChatMessage, MessageRole, SessionStore};
use chat_relay_core::ConversationId;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const BACKEND: &str = "openai";

/// Configuration for the OpenAI backend.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// API base URL, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// System instruction prepended to every request.
    pub system_prompt: String,
    /// Maximum number of history messages kept per session.
    pub history_limit: usize,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
struct CompletionMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn role_name(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

fn build_messages<'a>(
    system_prompt: &'a str,
    history: &'a [ChatMessage],
    text: &'a str,
) -> Vec<CompletionMessage<'a>> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(CompletionMessage {
        role: "system",
        content: system_prompt,
    });
    messages.extend(history.iter().map(|m| CompletionMessage {
        role: role_name(m.role),
        content: &m.content,
    }));
    messages.push(CompletionMessage {
        role: "user",
        content: text,
    });
    messages
}

fn parse_completion(response: CompletionResponse) -> Result<String, GenerationError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::ResponseParseFailed {
            backend: BACKEND.to_string(),
            reason: "response contained no choices".to_string(),
        })?;
    Ok(choice.message.content.unwrap_or_default())
}

/// Stateful backend talking to OpenAI chat completions.
#[derive(Debug)]
pub struct OpenAiSessionBackend {
    http: reqwest::Client,
    config: OpenAiConfig,
    sessions: SessionStore,
}

impl OpenAiSessionBackend {
    /// Creates a backend using the given HTTP client.
    #[must_use]
    pub fn new(http: reqwest::Client, config: OpenAiConfig) -> Self {
        let sessions = SessionStore::new(config.history_limit);
        Self {
            http,
            config,
            sessions,
        }
    }

    /// Returns the session store.
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    fn session_error(error: impl std::fmt::Display) -> GenerationError {
        GenerationError::Session {
            reason: error.to_string(),
        }
    }
}

#[async_trait]
impl AnswerBackend for OpenAiSessionBackend {
    #[instrument(skip(self, text), fields(conversation = %conversation, model = %self.config.model))]
    async fn generate(
        &self,
        text: &str,
        conversation: &ConversationId,
    ) -> Result<String, GenerationError> {
        if self
            .sessions
            .ensure(conversation)
            .map_err(Self::session_error)?
        {
            debug!("opened new session");
        }
        let history = self
            .sessions
            .history(conversation)
            .map_err(Self::session_error)?;

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = CompletionRequest {
            model: &self.config.model,
            messages: build_messages(&self.config.system_prompt, &history, text),
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::transport(BACKEND, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                backend: BACKEND.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse =
            response
                .json()
                .await
                .map_err(|e| GenerationError::ResponseParseFailed {
                    backend: BACKEND.to_string(),
                    reason: e.to_string(),
                })?;
        let answer = parse_completion(parsed)?;

        self.sessions
            .record_exchange(conversation, text, &answer)
            .map_err(Self::session_error)?;

        debug!(answer_len = answer.len(), "completion received");
        Ok(answer)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Gpt
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
