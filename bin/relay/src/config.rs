//! Centralized relay configuration.
//!
//! Loaded via the `config` crate from environment variables. Nested keys use
//! `__` as separator, e.g. `DELIVERY__MS_PER_CHAR`.

use crate::error::ConfigurationError;
use chat_relay_ai::{
    AnswerGenerator, BackendKind, DEFAULT_SYSTEM_PROMPT, GeminiBackend, GeminiConfig,
    OpenAiConfig, OpenAiSessionBackend,
};
use chat_relay_integration::{PacingConfig, WhisperConfig};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Relay configuration.
#[derive(Debug, Deserialize)]
pub struct RelayConfig {
    /// Which backend answers messages.
    #[serde(default)]
    pub ai_selected: BackendKind,

    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    /// Messages kept per conversation session.
    #[serde(default = "default_openai_history_turns")]
    pub openai_history_turns: usize,

    pub gemini_api_key: Option<String>,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    /// System instruction shared by both backends.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    pub transcription_api_key: Option<String>,
    #[serde(default = "default_transcription_url")]
    pub transcription_url: String,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,

    /// Base URL of the messaging gateway.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    pub gateway_token: Option<String>,

    /// Address the webhook listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Timeout applied to every outbound HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub delivery: PacingConfig,

    /// Where voice notes are staged. Defaults to the OS temp dir.
    pub staging_dir: Option<PathBuf>,
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_history_turns() -> usize {
    20
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_transcription_url() -> String {
    "https://api.openai.com/v1/audio/transcriptions".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Returns the value if it is present and not blank.
fn credential(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn require<'a>(
    value: Option<&'a String>,
    variable: &'static str,
    purpose: &'static str,
) -> Result<&'a str, ConfigurationError> {
    credential(value).ok_or(ConfigurationError::MissingCredential { variable, purpose })
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment cannot be deserialized. Missing
    /// credentials are reported by [`RelayConfig::validate`].
    pub fn from_env() -> chat_relay_core::Result<Self, ConfigurationError> {
        Self::load(config::Environment::default())
    }

    fn load(
        environment: config::Environment,
    ) -> chat_relay_core::Result<Self, ConfigurationError> {
        let loaded: Self = config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| ConfigurationError::Load {
                reason: e.to_string(),
            })?;
        Ok(loaded)
    }

    /// Checks that every credential the relay needs is present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingCredential`] when the selected
    /// backend's key or the transcription key is absent or blank.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self.ai_selected {
            BackendKind::Gpt => {
                require(
                    self.openai_api_key.as_ref(),
                    "OPENAI_API_KEY",
                    "selected answer backend",
                )?;
            }
            BackendKind::Gemini => {
                require(
                    self.gemini_api_key.as_ref(),
                    "GEMINI_API_KEY",
                    "selected answer backend",
                )?;
            }
        }
        require(
            self.transcription_api_key.as_ref(),
            "TRANSCRIPTION_API_KEY",
            "voice transcription",
        )?;
        Ok(())
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Returns the staging directory for voice notes.
    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Builds the selected answer backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the selected backend's key is missing.
    pub fn answer_generator(
        &self,
        http: reqwest::Client,
    ) -> Result<AnswerGenerator, ConfigurationError> {
        let generator: AnswerGenerator = match self.ai_selected {
            BackendKind::Gpt => {
                let api_key = require(
                    self.openai_api_key.as_ref(),
                    "OPENAI_API_KEY",
                    "selected answer backend",
                )?;
                OpenAiSessionBackend::new(
                    http,
                    OpenAiConfig {
                        api_key: api_key.to_string(),
                        model: self.openai_model.clone(),
                        base_url: self.openai_base_url.clone(),
                        system_prompt: self.system_prompt.clone(),
                        history_limit: self.openai_history_turns,
                    },
                )
                .into()
            }
            BackendKind::Gemini => {
                let api_key = require(
                    self.gemini_api_key.as_ref(),
                    "GEMINI_API_KEY",
                    "selected answer backend",
                )?;
                GeminiBackend::new(
                    http,
                    GeminiConfig {
                        api_key: api_key.to_string(),
                        model: self.gemini_model.clone(),
                        base_url: self.gemini_base_url.clone(),
                        system_prompt: self.system_prompt.clone(),
                    },
                )
                .into()
            }
        };
        Ok(generator)
    }

    /// Builds the speech-to-text client settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the transcription key is missing.
    pub fn whisper(&self) -> Result<WhisperConfig, ConfigurationError> {
        let api_key = require(
            self.transcription_api_key.as_ref(),
            "TRANSCRIPTION_API_KEY",
            "voice transcription",
        )?;
        Ok(WhisperConfig {
            api_key: api_key.to_string(),
            url: self.transcription_url.clone(),
            model: self.transcription_model.clone(),
        })
    }

    /// Returns the gateway token if one is configured.
    #[must_use]
    pub fn gateway_token(&self) -> Option<String> {
        credential(self.gateway_token.as_ref()).map(str::to_string)
    }
}
