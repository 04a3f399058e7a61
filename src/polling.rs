//! Recurring async tasks with cancellation
//!
//! A poll loop waits one full period before its first tick and awaits each
//! invocation before waiting for the next, so invocations of a single loop
//! never overlap. Cancelling stops future ticks but lets an in-flight
//! invocation finish; consumers discard results that are no longer relevant.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Shortest period accepted; tokio rejects a zero interval
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Handle to a running poll loop. Dropping the handle cancels the loop.
#[derive(Debug)]
pub struct PollHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop scheduling ticks
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[allow(dead_code)] // Checked by tests
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the loop task has exited
    #[allow(dead_code)] // Checked by tests
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Invoke `action` every `period`, starting one period from now
pub fn start<F, Fut>(period: Duration, mut action: F) -> PollHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let period = period.max(MIN_PERIOD);
    let token = CancellationToken::new();
    let cancelled = token.clone();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = cancelled.cancelled() => break,
                _ = ticker.tick() => {}
            }
            action().await;
        }

        tracing::trace!(period_ms = %period.as_millis(), "Poll loop stopped");
    });

    PollHandle { token, task }
}
