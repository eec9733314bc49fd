//! Cancellable deferred work.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Work scheduled to start after a delay.
///
/// Cancelling only prevents work that has not started yet. Once the delay
/// elapses the work is detached onto its own task, so a late `cancel` can
/// never interrupt it.
#[derive(Debug)]
pub struct DeferredTask {
    timer: JoinHandle<()>,
}

impl DeferredTask {
    /// Schedules `work` to start after `delay`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(delay: Duration, work: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(work);
        });
        Self { timer }
    }

    /// Cancels the work if it has not started yet.
    pub fn cancel(&self) {
        self.timer.abort();
    }
}
