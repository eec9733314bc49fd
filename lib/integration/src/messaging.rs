//! Messaging client contract and the HTTP gateway adapter.
//!
//! The chat-app session (login, persistence, reconnects) is owned by a
//! separate gateway process. The relay only needs to fetch media and send
//! messages through it.

use crate::error::MessagingError;
use async_trait::async_trait;
use chat_relay_conversation::MediaRef;
use chat_relay_core::ConversationId;
use serde::Serialize;
use tracing::{debug, instrument};

/// Operations the relay needs from the messaging client.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Downloads the raw bytes of a media attachment.
    async fn download_media(&self, media: &MediaRef) -> Result<Vec<u8>, MessagingError>;

    /// Sends a text message.
    async fn send_text(&self, to: &ConversationId, text: &str) -> Result<(), MessagingError>;

    /// Shows a typing indicator. Clients without one can rely on the default.
    async fn send_typing(&self, _to: &ConversationId) -> Result<(), MessagingError> {
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SendTextBody<'a> {
    to: &'a ConversationId,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct TypingBody<'a> {
    to: &'a ConversationId,
}

/// Messaging client backed by an HTTP gateway.
///
/// Endpoints, relative to the base URL:
/// - `GET /media/{id}` returns the raw media bytes
/// - `POST /messages` with `{"to", "text"}` sends a message
/// - `POST /typing` with `{"to"}` shows the typing indicator
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpGateway {
    /// Creates a gateway client.
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            token,
        }
    }

    /// Returns the gateway base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) if !token.is_empty() => request.bearer_auth(token),
            _ => request,
        }
    }

    async fn check(
        operation: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, MessagingError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(MessagingError::Status {
            operation: operation.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        operation: &str,
        path: &str,
        body: &T,
    ) -> Result<(), MessagingError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .authorize(self.http.post(&url))
            .json(body)
            .send()
            .await
            .map_err(|e| MessagingError::transport(operation, &e))?;
        Self::check(operation, response).await?;
        Ok(())
    }
}

#[async_trait]
impl MessagingClient for HttpGateway {
    #[instrument(skip(self), fields(media_id = %media.id))]
    async fn download_media(&self, media: &MediaRef) -> Result<Vec<u8>, MessagingError> {
        const OPERATION: &str = "media download";
        let url = format!("{}/media/{}", self.base_url, media.id);
        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|e| MessagingError::transport(OPERATION, &e))?;
        let response = Self::check(OPERATION, response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| MessagingError::transport(OPERATION, &e))?;
        debug!(size = bytes.len(), "media downloaded");
        Ok(bytes.to_vec())
    }

    #[instrument(skip(self, text), fields(to = %to, len = text.len()))]
    async fn send_text(&self, to: &ConversationId, text: &str) -> Result<(), MessagingError> {
        self.post_json("send", "/messages", &SendTextBody { to, text })
            .await
    }

    async fn send_typing(&self, to: &ConversationId) -> Result<(), MessagingError> {
        self.post_json("typing", "/typing", &TypingBody { to }).await
    }
}
