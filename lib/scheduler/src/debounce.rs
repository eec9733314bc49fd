//! Per-conversation debouncing.
//!
//! Each conversation has at most one pending entry: the latest buffered text
//! and the settle timer armed for it. A new message replaces the text and
//! re-arms the timer. When a timer fires, its entry is removed and the settle
//! handler runs once with the text buffered at that moment.
//!
//! Messages whose text is not known on arrival (voice notes waiting for a
//! transcript) take a [`Reservation`] first. Reserving counts as a new
//! message: it holds the slot in arrival order and stops the armed timer.
//! The text is supplied later with [`DebounceScheduler::fill`], which only
//! succeeds if nothing newer arrived in the meantime.
//!
//! The buffer and the timer live in the same entry behind one lock. Every
//! entry carries the generation number of the message that last touched it;
//! a timer only claims the entry if the generation still matches, which
//! makes a fired timer that lost the race against a newer message a no-op.

use crate::deferred::DeferredTask;
use async_trait::async_trait;
use chat_relay_core::{ConversationId, SettleRunId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// Quiet period after which a burst is considered settled.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(7000);

/// A settled burst handed to the settle handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettleRun {
    /// Identifier for log correlation.
    pub id: SettleRunId,
    /// Conversation the burst came from.
    pub conversation: ConversationId,
    /// Buffered text at the time the timer fired.
    pub content: String,
}

/// Receives settled bursts.
///
/// Implementations own their error handling: failures must be logged and
/// swallowed, since nothing above the handler can act on them.
#[async_trait]
pub trait SettleHandler: Send + Sync + 'static {
    /// Processes one settled burst.
    async fn settle(&self, run: SettleRun);
}

/// A conversation slot held for a message whose text arrives later.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a reservation holds back the settle timer until it is filled"]
pub struct Reservation {
    conversation: ConversationId,
    generation: u64,
}

impl Reservation {
    /// Returns the conversation the slot belongs to.
    pub fn conversation(&self) -> &ConversationId {
        &self.conversation
    }
}

struct Pending {
    /// `None` while a reservation is outstanding and nothing was buffered before it.
    content: Option<String>,
    generation: u64,
    /// Unset while a reservation is outstanding.
    timer: Option<DeferredTask>,
}

impl Pending {
    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

#[derive(Default)]
struct State {
    next_generation: u64,
    pending: HashMap<ConversationId, Pending>,
}

impl State {
    fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}

struct Inner<H> {
    state: Mutex<State>,
    handler: Arc<H>,
    delay: Duration,
}

impl<H: SettleHandler> Inner<H> {
    fn state(&self) -> MutexGuard<'_, State> {
        // Critical sections never panic midway, so a poisoned map is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes the entry if it still belongs to `generation`.
    fn claim(&self, conversation: &ConversationId, generation: u64) -> Option<String> {
        let mut state = self.state();
        match state.pending.get(conversation) {
            Some(entry) if entry.generation == generation => state
                .pending
                .remove(conversation)
                .and_then(|entry| entry.content),
            _ => None,
        }
    }

    async fn fire(&self, conversation: ConversationId, generation: u64) {
        let Some(content) = self.claim(&conversation, generation) else {
            debug!(conversation = %conversation, generation, "stale settle timer ignored");
            return;
        };

        let run = SettleRun {
            id: SettleRunId::new(),
            conversation,
            content,
        };
        info!(run_id = %run.id, conversation = %run.conversation, "burst settled");
        let run_id = run.id;
        self.handler.settle(run).await;
        debug!(run_id = %run_id, "settle pipeline finished");
    }
}

/// Coalesces bursts of messages per conversation.
pub struct DebounceScheduler<H> {
    inner: Arc<Inner<H>>,
}

impl<H> Clone for DebounceScheduler<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: SettleHandler> DebounceScheduler<H> {
    /// Creates a scheduler using [`DEFAULT_SETTLE_DELAY`].
    #[must_use]
    pub fn new(handler: Arc<H>) -> Self {
        Self::with_delay(handler, DEFAULT_SETTLE_DELAY)
    }

    /// Creates a scheduler with a custom settle delay.
    #[must_use]
    pub fn with_delay(handler: Arc<H>, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                handler,
                delay,
            }),
        }
    }

    /// Returns the settle delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    fn arm(&self, conversation: ConversationId, generation: u64) -> DeferredTask {
        let inner = Arc::clone(&self.inner);
        DeferredTask::schedule(self.inner.delay, async move {
            inner.fire(conversation, generation).await;
        })
    }

    /// Buffers `text` as the only pending content for `conversation` and
    /// (re)arms its settle timer.
    ///
    /// Any previously buffered text is discarded, the previous timer is
    /// cancelled and an outstanding reservation is superseded. A settle
    /// pipeline already running for the conversation is left alone. Must be
    /// called from within a Tokio runtime.
    pub fn on_message(&self, conversation: ConversationId, text: impl Into<String>) {
        let mut state = self.inner.state();
        let generation = state.next_generation();

        let entry = Pending {
            content: Some(text.into()),
            generation,
            timer: Some(self.arm(conversation.clone(), generation)),
        };
        let replaced = match state.pending.insert(conversation.clone(), entry) {
            Some(mut previous) => {
                previous.disarm();
                true
            }
            None => false,
        };
        debug!(conversation = %conversation, generation, replaced, "message buffered");
    }

    /// Holds the slot for a message of `conversation` whose text is not
    /// known yet.
    ///
    /// The armed timer is cancelled, so an earlier message cannot settle
    /// while the slot is held; its text stays buffered until the
    /// reservation is filled or superseded. Every reservation should end in
    /// [`fill`](Self::fill).
    pub fn reserve(&self, conversation: ConversationId) -> Reservation {
        let mut state = self.inner.state();
        let generation = state.next_generation();

        let entry = state
            .pending
            .entry(conversation.clone())
            .or_insert_with(|| Pending {
                content: None,
                generation,
                timer: None,
            });
        entry.generation = generation;
        entry.disarm();
        debug!(conversation = %conversation, generation, "slot reserved");

        Reservation {
            conversation,
            generation,
        }
    }

    /// Buffers the text for a reservation and arms the settle timer.
    ///
    /// Returns false, leaving the buffer untouched, if a newer message or
    /// reservation arrived for the conversation after `reservation` was
    /// taken, or if the slot was cancelled. Must be called from within a
    /// Tokio runtime.
    pub fn fill(&self, reservation: Reservation, text: impl Into<String>) -> bool {
        let Reservation {
            conversation,
            generation,
        } = reservation;
        let mut state = self.inner.state();

        let Some(entry) = state
            .pending
            .get_mut(&conversation)
            .filter(|entry| entry.generation == generation)
        else {
            debug!(conversation = %conversation, generation, "superseded reservation dropped");
            return false;
        };

        entry.content = Some(text.into());
        entry.timer = Some(self.arm(conversation.clone(), generation));
        debug!(conversation = %conversation, generation, "reserved message buffered");
        true
    }

    /// Returns true if `conversation` has buffered text or an outstanding
    /// reservation.
    #[must_use]
    pub fn is_pending(&self, conversation: &ConversationId) -> bool {
        self.inner.state().pending.contains_key(conversation)
    }

    /// Returns the text currently buffered for `conversation`.
    #[must_use]
    pub fn pending_content(&self, conversation: &ConversationId) -> Option<String> {
        self.inner
            .state()
            .pending
            .get(conversation)
            .and_then(|entry| entry.content.clone())
    }

    /// Returns the number of conversations with a pending entry.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.state().pending.len()
    }

    /// Cancels every pending timer, drops the buffered text and invalidates
    /// outstanding reservations.
    ///
    /// Settle pipelines already running are not affected. Returns the
    /// number of bursts discarded.
    pub fn cancel_all(&self) -> usize {
        let mut state = self.inner.state();
        let discarded = state.pending.len();
        for (_, mut entry) in state.pending.drain() {
            entry.disarm();
        }
        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    /// Handler that records each run when it starts and when it finishes.
    #[derive(Default)]
    struct Recorder {
        work: Duration,
        started: Mutex<Vec<(ConversationId, String)>>,
        finished: Mutex<Vec<(ConversationId, String)>>,
    }

    impl Recorder {
        fn taking(work: Duration) -> Self {
            Self {
                work,
                ..Self::default()
            }
        }

        fn started(&self) -> Vec<(ConversationId, String)> {
            self.started.lock().unwrap().clone()
        }

        fn finished(&self) -> Vec<(ConversationId, String)> {
            self.finished.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SettleHandler for Recorder {
        async fn settle(&self, run: SettleRun) {
            let record = (run.conversation, run.content);
            self.started.lock().unwrap().push(record.clone());
            if !self.work.is_zero() {
                sleep(self.work).await;
            }
            self.finished.lock().unwrap().push(record);
        }
    }

    fn alice() -> ConversationId {
        ConversationId::new("alice@c.us")
    }

    fn bob() -> ConversationId {
        ConversationId::new("bob@c.us")
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_settles_once_with_last_message() {
        let recorder = Arc::new(Recorder::default());
        let scheduler = DebounceScheduler::new(recorder.clone());

        scheduler.on_message(alice(), "one");
        sleep(secs(2)).await;
        scheduler.on_message(alice(), "two");
        sleep(secs(6)).await;
        scheduler.on_message(alice(), "three");

        assert_eq!(scheduler.pending_count(), 1);
        assert_eq!(scheduler.pending_content(&alice()).as_deref(), Some("three"));
        assert!(recorder.started().is_empty());

        sleep(secs(8)).await;

        assert_eq!(recorder.finished(), vec![(alice(), "three".to_string())]);
        assert!(!scheduler.is_pending(&alice()));
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_messages_settle_independently() {
        let recorder = Arc::new(Recorder::default());
        let scheduler = DebounceScheduler::new(recorder.clone());

        scheduler.on_message(alice(), "first");
        sleep(secs(8)).await;
        assert!(!scheduler.is_pending(&alice()));

        scheduler.on_message(alice(), "second");
        sleep(secs(8)).await;

        assert_eq!(
            recorder.finished(),
            vec![
                (alice(), "first".to_string()),
                (alice(), "second".to_string())
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn conversations_do_not_share_buffers() {
        let recorder = Arc::new(Recorder::default());
        let scheduler = DebounceScheduler::new(recorder.clone());

        scheduler.on_message(alice(), "from alice");
        sleep(secs(3)).await;
        scheduler.on_message(bob(), "from bob");
        assert_eq!(scheduler.pending_count(), 2);

        sleep(secs(5)).await;
        assert_eq!(recorder.finished(), vec![(alice(), "from alice".to_string())]);
        assert!(scheduler.is_pending(&bob()));

        sleep(secs(5)).await;
        assert_eq!(recorder.finished().len(), 2);
        assert_eq!(recorder.finished()[1], (bob(), "from bob".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn new_burst_does_not_interrupt_running_pipeline() {
        let recorder = Arc::new(Recorder::taking(secs(10)));
        let scheduler = DebounceScheduler::new(recorder.clone());

        scheduler.on_message(alice(), "one");
        sleep(secs(8)).await;
        assert_eq!(recorder.started(), vec![(alice(), "one".to_string())]);
        assert!(!scheduler.is_pending(&alice()));

        scheduler.on_message(alice(), "two");
        assert!(scheduler.is_pending(&alice()));

        sleep(secs(30)).await;

        let finished = recorder.finished();
        assert_eq!(finished.len(), 2);
        assert!(finished.contains(&(alice(), "one".to_string())));
        assert!(finished.contains(&(alice(), "two".to_string())));
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_delay_is_respected() {
        let recorder = Arc::new(Recorder::default());
        let scheduler = DebounceScheduler::with_delay(recorder.clone(), secs(1));
        assert_eq!(scheduler.delay(), secs(1));

        scheduler.on_message(alice(), "quick");
        sleep(Duration::from_millis(1500)).await;

        assert_eq!(recorder.finished(), vec![(alice(), "quick".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_discards_pending_bursts() {
        let recorder = Arc::new(Recorder::default());
        let scheduler = DebounceScheduler::new(recorder.clone());

        scheduler.on_message(alice(), "a");
        scheduler.on_message(bob(), "b");
        assert_eq!(scheduler.cancel_all(), 2);

        sleep(secs(10)).await;
        assert!(recorder.started().is_empty());
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn default_delay_is_seven_seconds() {
        let recorder = Arc::new(Recorder::default());
        let scheduler = DebounceScheduler::new(recorder.clone());

        scheduler.on_message(alice(), "hi");
        sleep(Duration::from_millis(6900)).await;
        assert!(recorder.started().is_empty());

        sleep(Duration::from_millis(200)).await;
        assert_eq!(recorder.started().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reserved_slot_waits_for_fill() {
        let recorder = Arc::new(Recorder::default());
        let scheduler = DebounceScheduler::new(recorder.clone());

        let reservation = scheduler.reserve(alice());
        assert_eq!(reservation.conversation(), &alice());
        assert!(scheduler.is_pending(&alice()));
        assert_eq!(scheduler.pending_content(&alice()), None);

        sleep(secs(20)).await;
        assert!(recorder.started().is_empty());

        assert!(scheduler.fill(reservation, "transcript"));
        sleep(Duration::from_millis(6900)).await;
        assert!(recorder.started().is_empty());

        sleep(Duration::from_millis(200)).await;
        assert_eq!(recorder.finished(), vec![(alice(), "transcript".to_string())]);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_message_supersedes_outstanding_reservation() {
        let recorder = Arc::new(Recorder::default());
        let scheduler = DebounceScheduler::new(recorder.clone());

        let reservation = scheduler.reserve(alice());
        sleep(Duration::from_millis(20)).await;
        scheduler.on_message(alice(), "newer text");
        sleep(Duration::from_millis(300)).await;

        assert!(!scheduler.fill(reservation, "older voice note"));
        assert_eq!(
            scheduler.pending_content(&alice()).as_deref(),
            Some("newer text")
        );

        sleep(secs(8)).await;
        assert_eq!(recorder.finished(), vec![(alice(), "newer text".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn reservation_holds_back_earlier_message() {
        let recorder = Arc::new(Recorder::default());
        let scheduler = DebounceScheduler::new(recorder.clone());

        scheduler.on_message(alice(), "text");
        sleep(secs(6)).await;
        let reservation = scheduler.reserve(alice());

        // The text's own timer would have fired at 7s.
        sleep(secs(3)).await;
        assert!(recorder.started().is_empty());
        assert_eq!(scheduler.pending_content(&alice()).as_deref(), Some("text"));

        assert!(scheduler.fill(reservation, "transcript"));
        sleep(secs(8)).await;

        assert_eq!(recorder.finished(), vec![(alice(), "transcript".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_invalidates_reservations() {
        let recorder = Arc::new(Recorder::default());
        let scheduler = DebounceScheduler::new(recorder.clone());

        let reservation = scheduler.reserve(alice());
        assert_eq!(scheduler.cancel_all(), 1);
        assert!(!scheduler.fill(reservation, "late"));

        sleep(secs(10)).await;
        assert!(recorder.started().is_empty());
        assert_eq!(scheduler.pending_count(), 0);
    }
}
