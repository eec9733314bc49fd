//! Settle pipeline: answer a settled burst and relay the reply.

use async_trait::async_trait;
use chat_relay_ai::{AnswerBackend, MAX_ATTEMPTS, generate_with_retry};
use chat_relay_conversation::split_reply;
use chat_relay_integration::{MessagingClient, PacedDelivery};
use chat_relay_scheduler::{SettleHandler, SettleRun};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Runs generate → split → deliver for each settled burst.
///
/// Failures end the run: they are logged with the run id and the
/// conversation gets no reply for that burst.
pub struct SettlePipeline<B> {
    backend: B,
    client: Arc<dyn MessagingClient>,
    delivery: PacedDelivery,
    max_attempts: u32,
}

impl<B: AnswerBackend> SettlePipeline<B> {
    #[must_use]
    pub fn new(backend: B, client: Arc<dyn MessagingClient>, delivery: PacedDelivery) -> Self {
        Self {
            backend,
            client,
            delivery,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[async_trait]
impl<B: AnswerBackend + 'static> SettleHandler for SettlePipeline<B> {
    #[instrument(
        skip_all,
        fields(run_id = %run.id, conversation = %run.conversation, backend = %self.backend.kind())
    )]
    async fn settle(&self, run: SettleRun) {
        let answer = match generate_with_retry(
            &self.backend,
            &run.content,
            &run.conversation,
            self.max_attempts,
        )
        .await
        {
            Ok(answer) => answer,
            Err(report) => {
                error!(error = %report, "generation failed, dropping burst");
                return;
            }
        };

        let chunks = split_reply(&answer);
        if let Err(report) = self
            .delivery
            .deliver(self.client.as_ref(), &chunks, &run.conversation)
            .await
        {
            error!(error = %report, "delivery failed");
            return;
        }
        info!(chunks = chunks.len(), "reply delivered");
    }
}
