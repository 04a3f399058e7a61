//! Effects produced by state transitions

use crate::model::Message;
use crate::view::Notification;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send the draft to the thread
    CreateMessage { thread_id: String, text: String },

    /// Optimistically add a just-created message to the store
    AppendMessage { message: Message },

    ClearDraft,

    /// Ask the assistant to process the thread
    CreateRun {
        thread_id: String,
        assistant_id: String,
    },

    /// Start the per-run status loop
    StartRunPolling { thread_id: String, run_id: String },

    /// Stop the per-run status loop
    CancelRunPolling,

    /// One immediate full message refresh
    RefreshMessages,

    /// Surface a transient notification
    Notify(Notification),
}

impl Effect {
    pub fn notify_success(text: impl Into<String>) -> Self {
        Effect::Notify(Notification::success(text))
    }

    pub fn notify_error(text: impl Into<String>) -> Self {
        Effect::Notify(Notification::error(text))
    }
}
