//! Controller state types

use serde::Serialize;

/// Default ceiling on non-terminal run status observations
pub const DEFAULT_MAX_RUN_POLLS: u32 = 300;

/// Where the current send action stands
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// Ready for a submit
    #[default]
    Idle,

    /// `createMessage` in flight
    Sending,

    /// Message accepted, `createRun` in flight
    RunStarting,

    /// Waiting for the run to reach a terminal status
    RunPolling {
        run_id: String,
        /// Non-terminal observations so far
        polls: u32,
    },
}

impl ConvState {
    #[allow(dead_code)] // Used by property tests
    pub fn is_idle(&self) -> bool {
        matches!(self, ConvState::Idle)
    }

    /// Drives the `sending` view flag
    pub fn is_sending(&self) -> bool {
        matches!(self, ConvState::Sending | ConvState::RunStarting)
    }

    /// Drives the `pollingRun` view flag
    pub fn is_polling_run(&self) -> bool {
        matches!(self, ConvState::RunPolling { .. })
    }

    /// Run currently being polled
    #[allow(dead_code)] // Diagnostics
    pub fn run_id(&self) -> Option<&str> {
        match self {
            ConvState::RunPolling { run_id, .. } => Some(run_id),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConvState::Idle => "idle",
            ConvState::Sending => "sending",
            ConvState::RunStarting => "run_starting",
            ConvState::RunPolling { .. } => "run_polling",
        }
    }
}

/// Conversation-scoped inputs to every transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvContext {
    pub thread_id: Option<String>,
    pub assistant_id: Option<String>,
    /// `None` polls until the run settles
    pub max_run_polls: Option<u32>,
}

impl ConvContext {
    pub fn new(thread_id: Option<String>, assistant_id: Option<String>) -> Self {
        Self {
            thread_id,
            assistant_id,
            max_run_polls: Some(DEFAULT_MAX_RUN_POLLS),
        }
    }

    #[must_use]
    pub fn with_max_run_polls(mut self, max_run_polls: Option<u32>) -> Self {
        self.max_run_polls = max_run_polls.filter(|&n| n > 0);
        self
    }

    /// Thread and assistant a send would target
    pub fn target(&self) -> (Option<&str>, Option<&str>) {
        (
            self.thread_id.as_deref().filter(|t| !t.is_empty()),
            self.assistant_id.as_deref().filter(|a| !a.is_empty()),
        )
    }
}
