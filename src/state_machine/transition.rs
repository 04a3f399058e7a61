//! Pure state transition function

use super::{ConvContext, ConvState, Effect, Event};
use crate::model::{Run, RunStatus};
use thiserror::Error;

pub const MESSAGE_SENT: &str = "Message sent.";
pub const SEND_FAILED: &str = "Failed to send message. Please try again.";
pub const RUN_START_FAILED: &str = "Failed to start run.";
pub const RUN_POLL_FAILED: &str = "Failed to poll run status.";

/// How a send action ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Success,
    Failure,
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
    /// Set when this transition ended a send action
    pub settled: Option<Settled>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
            settled: None,
        }
    }

    /// Back to `Idle`, ending the current send action
    pub fn settle(outcome: Settled) -> Self {
        Self {
            new_state: ConvState::Idle,
            effects: vec![],
            settled: Some(outcome),
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Why a submit was refused before any network call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No active thread")]
    NoThread,
    #[error("No assistant configured")]
    NoAssistant,
    #[error("A message is already being sent")]
    SendInFlight,
    #[error("Message is empty")]
    EmptyDraft,
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Failed to send message. {0}")]
    Rejected(#[from] ValidationError),
    /// A late result for a step the controller has already left
    #[error("Ignoring {event} while {state}")]
    Stale {
        state: &'static str,
        event: &'static str,
    },
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs. On `Err` the
/// caller keeps its current state.
pub fn transition(
    state: &ConvState,
    context: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Submit
        // ============================================================
        (ConvState::Idle, Event::Submit { draft }) => {
            let (thread_id, _) = validate_submit(context, &draft)?;
            Ok(
                TransitionResult::new(ConvState::Sending).with_effect(Effect::CreateMessage {
                    thread_id: thread_id.to_string(),
                    text: draft,
                }),
            )
        }

        // The provider refuses new messages while a run is active, so polling
        // counts as in flight too
        (
            ConvState::Sending | ConvState::RunStarting | ConvState::RunPolling { .. },
            Event::Submit { .. },
        ) => Err(ValidationError::SendInFlight.into()),

        // ============================================================
        // Message creation
        // ============================================================
        (ConvState::Sending, Event::MessageCreated { message }) => {
            let (Some(thread_id), Some(assistant_id)) = context.target() else {
                return Ok(TransitionResult::settle(Settled::Failure)
                    .with_effect(Effect::AppendMessage { message })
                    .with_effect(Effect::ClearDraft)
                    .with_effect(Effect::notify_error(RUN_START_FAILED)));
            };
            Ok(TransitionResult::new(ConvState::RunStarting).with_effects([
                Effect::AppendMessage { message },
                Effect::ClearDraft,
                Effect::notify_success(MESSAGE_SENT),
                Effect::CreateRun {
                    thread_id: thread_id.to_string(),
                    assistant_id: assistant_id.to_string(),
                },
            ]))
        }

        // Draft is kept so the user can retry
        (ConvState::Sending, Event::MessageFailed { .. }) => {
            Ok(TransitionResult::settle(Settled::Failure)
                .with_effect(Effect::notify_error(SEND_FAILED)))
        }

        // ============================================================
        // Run creation
        // ============================================================
        (ConvState::RunStarting, Event::RunCreated { run }) => {
            let thread_id = context
                .thread_id
                .clone()
                .unwrap_or_else(|| run.thread_id.clone());
            Ok(TransitionResult::new(ConvState::RunPolling {
                run_id: run.id.clone(),
                polls: 0,
            })
            .with_effect(Effect::StartRunPolling {
                thread_id,
                run_id: run.id,
            }))
        }

        // The appended message stays visible
        (ConvState::RunStarting, Event::RunStartFailed { .. }) => {
            Ok(TransitionResult::settle(Settled::Failure)
                .with_effect(Effect::notify_error(RUN_START_FAILED)))
        }

        // ============================================================
        // Run polling
        // ============================================================
        (ConvState::RunPolling { run_id, polls }, Event::RunPolled { run })
            if *run_id == run.id =>
        {
            Ok(handle_poll(run_id, *polls, context, &run))
        }

        (ConvState::RunPolling { run_id, .. }, Event::RunPollFailed { run_id: polled, .. })
            if *run_id == polled =>
        {
            Ok(TransitionResult::settle(Settled::Failure)
                .with_effect(Effect::CancelRunPolling)
                .with_effect(Effect::notify_error(RUN_POLL_FAILED)))
        }

        // ============================================================
        // Everything else is a result nobody is waiting for
        // ============================================================
        (state, event) => Err(TransitionError::Stale {
            state: state.name(),
            event: event.name(),
        }),
    }
}

fn validate_submit<'a>(
    context: &'a ConvContext,
    draft: &str,
) -> Result<(&'a str, &'a str), ValidationError> {
    let (thread_id, assistant_id) = context.target();
    let thread_id = thread_id.ok_or(ValidationError::NoThread)?;
    let assistant_id = assistant_id.ok_or(ValidationError::NoAssistant)?;
    if draft.trim().is_empty() {
        return Err(ValidationError::EmptyDraft);
    }
    Ok((thread_id, assistant_id))
}

fn handle_poll(run_id: &str, polls: u32, context: &ConvContext, run: &Run) -> TransitionResult {
    match run.status {
        RunStatus::Completed => TransitionResult::settle(Settled::Success)
            .with_effect(Effect::CancelRunPolling)
            .with_effect(Effect::RefreshMessages),

        RunStatus::Failed => {
            let text = match run.last_error.as_deref() {
                Some(reason) if !reason.is_empty() => format!("Run failed! {reason}"),
                _ => "Run failed!".to_string(),
            };
            TransitionResult::settle(Settled::Failure)
                .with_effect(Effect::CancelRunPolling)
                .with_effect(Effect::notify_error(text))
        }

        _ => {
            let polls = polls.saturating_add(1);
            match context.max_run_polls {
                Some(max) if polls >= max => TransitionResult::settle(Settled::Failure)
                    .with_effect(Effect::CancelRunPolling)
                    .with_effect(Effect::notify_error(format!(
                        "Gave up waiting for the assistant after {polls} status checks."
                    ))),
                _ => TransitionResult::new(ConvState::RunPolling {
                    run_id: run_id.to_string(),
                    polls,
                }),
            }
        }
    }
}
