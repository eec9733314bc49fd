//! Inbound event routing.
//!
//! Events are accepted synchronously in arrival order: text is buffered at
//! once, and a voice note reserves its conversation's slot before the slow
//! transcription starts. A transcript that finishes after a newer message
//! arrived is dropped.

use chat_relay_conversation::{IgnoreReason, InboundEvent, Route, VoiceNote};
use chat_relay_integration::{MessagingClient, Transcriber};
use chat_relay_scheduler::{DebounceScheduler, Reservation, SettleHandler};
use std::sync::Arc;
use tracing::{debug, instrument};

/// What happened to an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The text was buffered for its conversation.
    Buffered,
    /// A newer message arrived before the transcript was ready.
    Superseded,
    /// The event was dropped.
    Ignored(IgnoreReason),
}

/// A voice note holding its conversation's slot while it waits for a
/// transcript.
#[derive(Debug)]
pub struct PendingVoice {
    reservation: Reservation,
    note: VoiceNote,
}

/// Result of accepting an event.
#[derive(Debug)]
pub enum Intake {
    /// Nothing left to do.
    Done(Disposition),
    /// The voice note still has to be transcribed with
    /// [`InboundRouter::complete`].
    Transcribe(PendingVoice),
}

/// Filters inbound events, transcribes voice notes and feeds the debounce
/// scheduler.
pub struct InboundRouter<H> {
    scheduler: DebounceScheduler<H>,
    transcriber: Transcriber,
    client: Arc<dyn MessagingClient>,
}

impl<H: SettleHandler> InboundRouter<H> {
    #[must_use]
    pub fn new(
        scheduler: DebounceScheduler<H>,
        transcriber: Transcriber,
        client: Arc<dyn MessagingClient>,
    ) -> Self {
        Self {
            scheduler,
            transcriber,
            client,
        }
    }

    #[must_use]
    pub fn scheduler(&self) -> &DebounceScheduler<H> {
        &self.scheduler
    }

    /// Accepts one inbound event without waiting on anything.
    ///
    /// Call this in arrival order. Text is buffered immediately; a voice
    /// note reserves its slot and is handed back for transcription.
    #[instrument(skip_all, fields(conversation = %event.conversation_id, message_id = %event.message_id))]
    pub fn accept(&self, event: InboundEvent) -> Intake {
        match event.route() {
            Route::Ignore(reason) => {
                debug!(%reason, "event ignored");
                Intake::Done(Disposition::Ignored(reason))
            }
            Route::Text(text) => {
                self.scheduler.on_message(event.conversation_id, text);
                Intake::Done(Disposition::Buffered)
            }
            Route::Voice(note) => Intake::Transcribe(PendingVoice {
                reservation: self.scheduler.reserve(event.conversation_id),
                note,
            }),
        }
    }

    /// Transcribes an accepted voice note and buffers the transcript.
    ///
    /// A failed transcription buffers the apology text instead.
    #[instrument(skip_all, fields(conversation = %voice.reservation.conversation(), message_id = %voice.note.message_id))]
    pub async fn complete(&self, voice: PendingVoice) -> Disposition {
        let PendingVoice { reservation, note } = voice;
        let text = self.transcriber.transcribe(self.client.as_ref(), &note).await;

        if self.scheduler.fill(reservation, text) {
            Disposition::Buffered
        } else {
            debug!("transcript superseded by a newer message");
            Disposition::Superseded
        }
    }

    /// Accepts an event and, for voice notes, waits for the transcript.
    pub async fn handle(&self, event: InboundEvent) -> Disposition {
        match self.accept(event) {
            Intake::Done(disposition) => disposition,
            Intake::Transcribe(voice) => self.complete(voice).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chat_relay_conversation::{MediaRef, MessageKind};
    use chat_relay_core::{ConversationId, MessageId};
    use chat_relay_integration::{
        MessagingError, SpeechToText, TRANSCRIPTION_APOLOGY, TranscriptionError,
    };
    use chat_relay_scheduler::SettleRun;
    use std::path::Path;
    use std::time::Duration;

    struct NoopHandler;

    #[async_trait]
    impl SettleHandler for NoopHandler {
        async fn settle(&self, _run: SettleRun) {}
    }

    struct Gateway;

    #[async_trait]
    impl MessagingClient for Gateway {
        async fn download_media(&self, _media: &MediaRef) -> Result<Vec<u8>, MessagingError> {
            Ok(b"audio".to_vec())
        }

        async fn send_text(&self, _to: &ConversationId, _text: &str) -> Result<(), MessagingError> {
            Ok(())
        }
    }

    struct Stt(Result<String, TranscriptionError>);

    #[async_trait]
    impl SpeechToText for Stt {
        async fn submit(&self, _audio: &Path) -> Result<String, TranscriptionError> {
            self.0.clone()
        }
    }

    /// Transcribes every note to the same text after a delay.
    struct SlowStt {
        delay: Duration,
        transcript: &'static str,
    }

    #[async_trait]
    impl SpeechToText for SlowStt {
        async fn submit(&self, _audio: &Path) -> Result<String, TranscriptionError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.transcript.to_string())
        }
    }

    fn router(
        stt: Result<String, TranscriptionError>,
        staging: &Path,
    ) -> InboundRouter<NoopHandler> {
        InboundRouter::new(
            DebounceScheduler::new(Arc::new(NoopHandler)),
            Transcriber::new(Arc::new(Stt(stt)), staging),
            Arc::new(Gateway),
        )
    }

    fn event(conversation: &str, kind: MessageKind) -> InboundEvent {
        InboundEvent {
            message_id: MessageId::new("msg-1"),
            conversation_id: ConversationId::new(conversation),
            sender: conversation.to_string(),
            kind,
            body: None,
            media: None,
            is_group: false,
            is_self: false,
        }
    }

    fn text(conversation: &str, body: &str) -> InboundEvent {
        InboundEvent {
            body: Some(body.to_string()),
            ..event(conversation, MessageKind::Text)
        }
    }

    fn voice(conversation: &str) -> InboundEvent {
        InboundEvent {
            media: Some(MediaRef {
                id: "media-1".to_string(),
                mime_type: "audio/ogg".to_string(),
            }),
            ..event(conversation, MessageKind::Voice)
        }
    }

    #[tokio::test]
    async fn text_is_buffered() {
        let dir = tempfile::tempdir().unwrap();
        let router = router(Ok(String::new()), dir.path());
        let alice = ConversationId::new("alice@c.us");

        assert_eq!(router.handle(text("alice@c.us", "hi")).await, Disposition::Buffered);
        assert_eq!(router.handle(text("alice@c.us", "there")).await, Disposition::Buffered);

        assert_eq!(
            router.scheduler().pending_content(&alice).as_deref(),
            Some("there")
        );
        router.scheduler().cancel_all();
    }

    #[tokio::test]
    async fn self_group_and_broadcast_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let router = router(Ok(String::new()), dir.path());

        let mut own = text("alice@c.us", "echo");
        own.is_self = true;
        assert_eq!(
            router.handle(own).await,
            Disposition::Ignored(IgnoreReason::FromSelf)
        );

        let mut flagged = text("alice@c.us", "hi all");
        flagged.is_group = true;
        assert_eq!(
            router.handle(flagged).await,
            Disposition::Ignored(IgnoreReason::Group)
        );
        assert_eq!(
            router.handle(text("12345@g.us", "hi all")).await,
            Disposition::Ignored(IgnoreReason::Group)
        );
        assert_eq!(
            router.handle(text("status@broadcast", "story")).await,
            Disposition::Ignored(IgnoreReason::Broadcast)
        );
        assert_eq!(router.scheduler().pending_count(), 0);
    }

    #[tokio::test]
    async fn blank_text_and_other_kinds_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let router = router(Ok(String::new()), dir.path());

        assert_eq!(
            router.handle(text("alice@c.us", "   ")).await,
            Disposition::Ignored(IgnoreReason::EmptyText)
        );
        assert_eq!(
            router.handle(event("alice@c.us", MessageKind::Other)).await,
            Disposition::Ignored(IgnoreReason::Unsupported)
        );
        assert_eq!(router.scheduler().pending_count(), 0);
    }

    #[tokio::test]
    async fn voice_is_transcribed_before_buffering() {
        let dir = tempfile::tempdir().unwrap();
        let router = router(Ok("spoken words".to_string()), dir.path());

        assert_eq!(router.handle(voice("bob@c.us")).await, Disposition::Buffered);
        assert_eq!(
            router
                .scheduler()
                .pending_content(&ConversationId::new("bob@c.us"))
                .as_deref(),
            Some("spoken words")
        );
        router.scheduler().cancel_all();
    }

    #[tokio::test]
    async fn failed_transcription_buffers_apology() {
        let dir = tempfile::tempdir().unwrap();
        let router = router(
            Err(TranscriptionError::RequestFailed {
                reason: "connection refused".to_string(),
            }),
            dir.path(),
        );

        assert_eq!(router.handle(voice("bob@c.us")).await, Disposition::Buffered);
        assert_eq!(
            router
                .scheduler()
                .pending_content(&ConversationId::new("bob@c.us"))
                .as_deref(),
            Some(TRANSCRIPTION_APOLOGY)
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        router.scheduler().cancel_all();
    }

    #[tokio::test]
    async fn slow_voice_note_does_not_override_newer_text() {
        let dir = tempfile::tempdir().unwrap();
        let router = Arc::new(InboundRouter::new(
            DebounceScheduler::new(Arc::new(NoopHandler)),
            Transcriber::new(
                Arc::new(SlowStt {
                    delay: Duration::from_millis(300),
                    transcript: "older voice note",
                }),
                dir.path(),
            ),
            Arc::new(Gateway),
        ));

        let voice_task = tokio::spawn({
            let router = router.clone();
            async move { router.handle(voice("alice@c.us")).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let text_task = tokio::spawn({
            let router = router.clone();
            async move { router.handle(text("alice@c.us", "newer text")).await }
        });

        assert_eq!(text_task.await.unwrap(), Disposition::Buffered);
        assert_eq!(voice_task.await.unwrap(), Disposition::Superseded);
        assert_eq!(
            router
                .scheduler()
                .pending_content(&ConversationId::new("alice@c.us"))
                .as_deref(),
            Some("newer text")
        );
        router.scheduler().cancel_all();
    }

    #[tokio::test]
    async fn accepted_voice_note_holds_slot_until_transcribed() {
        let dir = tempfile::tempdir().unwrap();
        let router = router(Ok("spoken words".to_string()), dir.path());
        let alice = ConversationId::new("alice@c.us");

        router.handle(text("alice@c.us", "typed first")).await;
        let Intake::Transcribe(pending) = router.accept(voice("alice@c.us")) else {
            panic!("voice note should wait for transcription");
        };
        assert!(router.scheduler().is_pending(&alice));
        assert_eq!(
            router.scheduler().pending_content(&alice).as_deref(),
            Some("typed first")
        );

        assert_eq!(router.complete(pending).await, Disposition::Buffered);
        assert_eq!(
            router.scheduler().pending_content(&alice).as_deref(),
            Some("spoken words")
        );
        router.scheduler().cancel_all();
    }
}
