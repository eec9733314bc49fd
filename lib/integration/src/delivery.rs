//! Paced reply delivery.

use crate::error::DeliveryError;
use crate::messaging::MessagingClient;
use chat_relay_core::ConversationId;
use rootcause::Report;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const fn default_ms_per_char() -> u64 {
    40
}

const fn default_min_delay_ms() -> u64 {
    800
}

const fn default_max_delay_ms() -> u64 {
    6000
}

/// How long to "type" before each message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_ms_per_char")]
    pub ms_per_char: u64,
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            ms_per_char: default_ms_per_char(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl PacingConfig {
    /// Pacing that sends immediately.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            ms_per_char: 0,
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Returns the delay before sending `text`.
    ///
    /// Proportional to the character count, clamped to
    /// `[min_delay_ms, max_delay_ms]`. A maximum below the minimum wins.
    #[must_use]
    pub fn delay_for(&self, text: &str) -> Duration {
        let chars = u64::try_from(text.chars().count()).unwrap_or(u64::MAX);
        let ms = chars
            .saturating_mul(self.ms_per_char)
            .max(self.min_delay_ms)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

/// Sends reply chunks in order, pausing between them like a human typist.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacedDelivery {
    pacing: PacingConfig,
}

impl PacedDelivery {
    /// Creates a delivery pacing each message with `pacing`.
    ///
    /// Use [`PacingConfig::none`] to send without pauses.
    #[must_use]
    pub fn new(pacing: PacingConfig) -> Self {
        Self { pacing }
    }

    /// Sends every message to `target`, in order.
    ///
    /// Typing indicators are best effort. The first failed send aborts the
    /// batch.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::SendFailed`] for the first message that could
    /// not be sent.
    #[instrument(skip(self, client, messages), fields(conversation = %target, count = messages.len()))]
    pub async fn deliver(
        &self,
        client: &dyn MessagingClient,
        messages: &[String],
        target: &ConversationId,
    ) -> Result<(), Report<DeliveryError>> {
        let total = messages.len();
        for (index, message) in messages.iter().enumerate() {
            if let Err(e) = client.send_typing(target).await {
                warn!(error = %e, "typing indicator failed");
            }

            let delay = self.pacing.delay_for(message);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            client
                .send_text(target, message)
                .await
                .map_err(|e| DeliveryError::SendFailed {
                    index,
                    total,
                    reason: e.to_string(),
                })?;
            debug!(index, total, delay_ms = delay.as_millis(), "message delivered");
        }
        Ok(())
    }
}
