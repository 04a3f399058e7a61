//! Runtime for open conversations
//!
//! One actor task per open conversation owns the message store, the draft and
//! the controller state. Everything that touches them arrives on the actor's
//! inbox, so there is no shared mutable state. Transport calls and poll loops
//! run as background tasks that report back through the same inbox.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationRuntime;

use crate::model::Message;
use crate::state_machine::{ConvContext, Event};
use crate::transport::{Transport, TransportError};
use crate::view::{ConversationView, Notification};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Period of both poll loops unless configured otherwise
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

const INBOX_CAPACITY: usize = 64;
const NOTIFICATION_CAPACITY: usize = 32;

/// Poll loop periods for one conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    pub run_poll_interval: Duration,
    /// Background message refresh; `None` disables both the load on open and
    /// the periodic refresh
    pub refresh_interval: Option<Duration>,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            run_poll_interval: DEFAULT_POLL_INTERVAL,
            refresh_interval: Some(DEFAULT_POLL_INTERVAL),
        }
    }
}

impl PollTiming {
    /// Same period for both loops
    pub fn uniform(interval: Duration) -> Self {
        Self {
            run_poll_interval: interval,
            refresh_interval: Some(interval),
        }
    }
}

/// Messages processed by the runtime actor
#[derive(Debug)]
pub(crate) enum Inbound {
    SetDraft(String),
    Send,
    Machine(Event),
    FetchStarted,
    Fetched(Result<Vec<Message>, TransportError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Conversation is closed")]
pub struct ConversationClosed;

/// Handle to interact with an open conversation
///
/// Dropping the handle closes the conversation and cancels its poll loops.
pub struct ConversationHandle {
    inbox: mpsc::Sender<Inbound>,
    view_rx: watch::Receiver<ConversationView>,
    notify_tx: broadcast::Sender<Notification>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ConversationHandle {
    pub async fn set_draft(&self, text: impl Into<String>) -> Result<(), ConversationClosed> {
        self.inbox
            .send(Inbound::SetDraft(text.into()))
            .await
            .map_err(|_| ConversationClosed)
    }

    /// Submit the current draft
    pub async fn send(&self) -> Result<(), ConversationClosed> {
        self.inbox
            .send(Inbound::Send)
            .await
            .map_err(|_| ConversationClosed)
    }

    /// Latest published view
    #[allow(dead_code)] // Snapshot access; the terminal subscribes instead
    pub fn view(&self) -> ConversationView {
        self.view_rx.borrow().clone()
    }

    pub fn subscribe_view(&self) -> watch::Receiver<ConversationView> {
        self.view_rx.clone()
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notify_tx.subscribe()
    }

    /// Close the conversation and wait for the actor to stop
    pub async fn close(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Conversation runtime panicked");
            }
        }
    }
}

impl Drop for ConversationHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Open a conversation over `transport` and start its actor
pub fn open_conversation<T>(
    transport: T,
    context: ConvContext,
    timing: PollTiming,
) -> ConversationHandle
where
    T: Transport + 'static,
{
    let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
    let (notify_tx, _) = broadcast::channel(NOTIFICATION_CAPACITY);
    let shutdown = CancellationToken::new();

    let runtime = ConversationRuntime::new(
        context,
        transport,
        timing,
        inbox_rx,
        inbox_tx.clone(),
        notify_tx.clone(),
        shutdown.clone(),
    );
    let view_rx = runtime.subscribe_view();
    let task = tokio::spawn(runtime.run());

    ConversationHandle {
        inbox: inbox_tx,
        view_rx,
        notify_tx,
        shutdown,
        task: Some(task),
    }
}
