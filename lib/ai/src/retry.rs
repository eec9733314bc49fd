//! Bounded retry for answer generation.

use crate::backend::AnswerBackend;
use crate::error::GenerationError;
use chat_relay_core::ConversationId;
use rootcause::Report;
use std::fmt;
use std::future::Future;
use tracing::{debug, error, warn};

/// Number of generation attempts per settled burst.
pub const MAX_ATTEMPTS: u32 = 3;

/// Reply sent when the backend produced an empty answer.
pub const FALLBACK_ANSWER: &str = "I didn't understand, could you repeat?";

/// Runs `operation` until it succeeds, at most `max_attempts` times.
///
/// The operation receives the 1-based attempt number. Attempts follow each
/// other immediately. Every failure is logged; only the last one is returned.
/// A bound of zero is treated as one.
pub async fn with_retry<T, E, F, Fut>(max_attempts: u32, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt < max_attempts => {
                warn!(attempt, max_attempts, error = %e, "attempt failed, retrying");
                attempt += 1;
            }
            Err(e) => {
                error!(attempt, max_attempts, error = %e, "final attempt failed");
                return Err(e);
            }
        }
    }
}

/// Replaces a blank answer with [`FALLBACK_ANSWER`].
#[must_use]
pub fn or_fallback(answer: String) -> String {
    if answer.trim().is_empty() {
        FALLBACK_ANSWER.to_string()
    } else {
        answer
    }
}

/// Generates an answer with bounded retries.
///
/// # Errors
///
/// Returns the last generation error once every attempt has failed.
pub async fn generate_with_retry<B>(
    backend: &B,
    text: &str,
    conversation: &ConversationId,
    max_attempts: u32,
) -> Result<String, Report<GenerationError>>
where
    B: AnswerBackend + ?Sized,
{
    let answer = with_retry(max_attempts, |attempt| {
        debug!(attempt, conversation = %conversation, "generating answer");
        backend.generate(text, conversation)
    })
    .await?;
    Ok(or_fallback(answer))
}
