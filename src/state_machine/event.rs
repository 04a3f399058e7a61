//! Events that drive the controller

use crate::model::{Message, Run};
use crate::transport::TransportError;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Submit {
        draft: String,
    },

    // Transport results
    MessageCreated {
        message: Message,
    },
    MessageFailed {
        error: TransportError,
    },
    RunCreated {
        run: Run,
    },
    RunStartFailed {
        error: TransportError,
    },

    // Poll ticks
    RunPolled {
        run: Run,
    },
    RunPollFailed {
        run_id: String,
        error: TransportError,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Submit { .. } => "submit",
            Event::MessageCreated { .. } => "message_created",
            Event::MessageFailed { .. } => "message_failed",
            Event::RunCreated { .. } => "run_created",
            Event::RunStartFailed { .. } => "run_start_failed",
            Event::RunPolled { .. } => "run_polled",
            Event::RunPollFailed { .. } => "run_poll_failed",
        }
    }

    /// Transport failure carried by the event
    pub fn failure(&self) -> Option<&TransportError> {
        match self {
            Event::MessageFailed { error }
            | Event::RunStartFailed { error }
            | Event::RunPollFailed { error, .. } => Some(error),
            _ => None,
        }
    }
}
