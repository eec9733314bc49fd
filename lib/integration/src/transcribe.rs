//! Voice note transcription.
//!
//! Audio is downloaded through the messaging client, staged on disk under a
//! name derived from the message id, and submitted to a speech-to-text
//! service. The staging file is removed in every outcome.

use crate::error::TranscriptionError;
use crate::messaging::MessagingClient;
use async_trait::async_trait;
use chat_relay_conversation::VoiceNote;
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Text relayed in place of a voice note that could not be transcribed.
pub const TRANSCRIPTION_APOLOGY: &str = "Sorry, I couldn't understand your voice message.";

/// A speech-to-text service.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribes the audio file at `audio`.
    async fn submit(&self, audio: &Path) -> Result<String, TranscriptionError>;
}

/// Configuration for [`WhisperApi`].
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Bearer token for the transcription service.
    pub api_key: String,
    /// Full endpoint URL, e.g. `https://api.openai.com/v1/audio/transcriptions`.
    pub url: String,
    /// Model name sent with each upload, e.g. `whisper-1`.
    pub model: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Client for OpenAI-compatible `/audio/transcriptions` endpoints.
#[derive(Debug, Clone)]
pub struct WhisperApi {
    http: reqwest::Client,
    config: WhisperConfig,
}

impl WhisperApi {
    /// Creates a client sending uploads through `http`.
    ///
    /// Request timeouts are whatever `http` was built with.
    #[must_use]
    pub fn new(http: reqwest::Client, config: WhisperConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl SpeechToText for WhisperApi {
    #[instrument(skip(self), fields(model = %self.config.model))]
    async fn submit(&self, audio: &Path) -> Result<String, TranscriptionError> {
        let bytes = tokio::fs::read(audio)
            .await
            .map_err(|e| TranscriptionError::Staging {
                path: audio.display().to_string(),
                reason: e.to_string(),
            })?;
        let file_name = audio
            .file_name()
            .map_or_else(|| "audio.ogg".to_string(), |n| n.to_string_lossy().into_owned());

        let form = reqwest::multipart::Form::new()
            .text("model", self.config.model.clone())
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );

        let response = self
            .http
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TranscriptionResponse =
            response
                .json()
                .await
                .map_err(|e| TranscriptionError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;
        Ok(parsed.text)
    }
}

/// Turns voice notes into text.
#[derive(Clone)]
pub struct Transcriber {
    stt: Arc<dyn SpeechToText>,
    staging_dir: PathBuf,
}

impl Transcriber {
    /// Creates a transcriber staging audio under `staging_dir`.
    pub fn new(stt: Arc<dyn SpeechToText>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            stt,
            staging_dir: staging_dir.into(),
        }
    }

    /// Returns where the audio for `note` is staged.
    #[must_use]
    pub fn staging_path(&self, note: &VoiceNote) -> PathBuf {
        self.staging_dir.join(format!(
            "{}.{}",
            note.message_id.file_stem(),
            note.media.extension()
        ))
    }

    /// Transcribes `note`, returning [`TRANSCRIPTION_APOLOGY`] on any failure.
    #[instrument(skip_all, fields(message_id = %note.message_id))]
    pub async fn transcribe(&self, client: &dyn MessagingClient, note: &VoiceNote) -> String {
        let path = self.staging_path(note);
        let outcome = self.stage_and_submit(client, note, &path).await;
        remove_staged(&path).await;

        match outcome {
            Ok(text) => {
                debug!(len = text.len(), "voice note transcribed");
                text
            }
            Err(e) => {
                warn!(error = %e, "transcription failed, sending apology");
                TRANSCRIPTION_APOLOGY.to_string()
            }
        }
    }

    async fn stage_and_submit(
        &self,
        client: &dyn MessagingClient,
        note: &VoiceNote,
        path: &Path,
    ) -> Result<String, TranscriptionError> {
        let audio = client
            .download_media(&note.media)
            .await
            .map_err(|e| TranscriptionError::Download {
                reason: e.to_string(),
            })?;

        let staging = |e: io::Error| TranscriptionError::Staging {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        tokio::fs::create_dir_all(&self.staging_dir)
            .await
            .map_err(staging)?;
        tokio::fs::write(path, &audio).await.map_err(staging)?;

        let text = self.stt.submit(path).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(TranscriptionError::EmptyTranscript);
        }
        Ok(text.to_string())
    }
}

async fn remove_staged(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove staged audio"),
    }
}
