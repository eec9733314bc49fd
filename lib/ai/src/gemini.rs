//! Google Gemini backend.
//!
//! Stateless: every call sends only the system instruction and the buffered
//! text. No session is created.

use crate::backend::{AnswerBackend, BackendKind};
use crate::error::GenerationError;
use async_trait::async_trait;
use chat_relay_core::ConversationId;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const BACKEND: &str = "gemini";

/// Configuration for the Gemini backend.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key sent in the `x-goog-api-key` header.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// API base URL, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub base_url: String,
    /// System instruction sent with every request.
    pub system_prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

fn build_request<'a>(system_prompt: &'a str, text: &'a str) -> GenerateRequest<'a> {
    GenerateRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: system_prompt,
            }],
        },
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part { text }],
        }],
    }
}

fn parse_response(response: GenerateResponse) -> Result<String, GenerationError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .map_or_else(
                || "response contained no candidates".to_string(),
                |block| format!("prompt blocked: {block}"),
            );
        return Err(GenerationError::ResponseParseFailed {
            backend: BACKEND.to_string(),
            reason,
        });
    };

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();
    Ok(text)
}

/// Stateless backend talking to the Gemini `generateContent` endpoint.
#[derive(Debug)]
pub struct GeminiBackend {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiBackend {
    /// Creates a backend using the given HTTP client.
    #[must_use]
    pub fn new(http: reqwest::Client, config: GeminiConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl AnswerBackend for GeminiBackend {
    #[instrument(skip(self, text), fields(conversation = %conversation, model = %self.config.model))]
    async fn generate(
        &self,
        text: &str,
        conversation: &ConversationId,
    ) -> Result<String, GenerationError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&build_request(&self.config.system_prompt, text))
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

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| GenerationError::ResponseParseFailed {
                    backend: BACKEND.to_string(),
                    reason: e.to_string(),
                })?;
        let answer = parse_response(parsed)?;

        debug!(answer_len = answer.len(), "generation received");
        Ok(answer)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Gemini
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
