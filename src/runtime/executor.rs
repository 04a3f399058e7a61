//! Conversation runtime executor

use super::{Inbound, PollTiming};
use crate::message_store::MessageStore;
use crate::model::Origin;
use crate::polling::{self, PollHandle};
use crate::state_machine::{transition, ConvContext, ConvState, Effect, Event, TransitionError};
use crate::transport::Transport;
use crate::view::{ConversationView, Notification};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Actor owning one open conversation
pub struct ConversationRuntime<T: Transport + 'static> {
    context: ConvContext,
    state: ConvState,
    store: MessageStore,
    draft: String,
    transport: Arc<T>,
    timing: PollTiming,
    inbox_rx: mpsc::Receiver<Inbound>,
    inbox_tx: mpsc::Sender<Inbound>,
    view_tx: watch::Sender<ConversationView>,
    notify_tx: broadcast::Sender<Notification>,
    shutdown: CancellationToken,
    /// Status loop of the run being polled
    run_poll: Option<PollHandle>,
    /// Background message refresh for the lifetime of the conversation
    refresh_poll: Option<PollHandle>,
    fetches_in_flight: usize,
    session_id: String,
}

impl<T: Transport + 'static> ConversationRuntime<T> {
    pub(crate) fn new(
        context: ConvContext,
        transport: T,
        timing: PollTiming,
        inbox_rx: mpsc::Receiver<Inbound>,
        inbox_tx: mpsc::Sender<Inbound>,
        notify_tx: broadcast::Sender<Notification>,
        shutdown: CancellationToken,
    ) -> Self {
        let (view_tx, _) = watch::channel(ConversationView::default());
        let runtime = Self {
            context,
            state: ConvState::Idle,
            store: MessageStore::new(),
            draft: String::new(),
            transport: Arc::new(transport),
            timing,
            inbox_rx,
            inbox_tx,
            view_tx,
            notify_tx,
            shutdown,
            run_poll: None,
            refresh_poll: None,
            fetches_in_flight: 0,
            session_id: uuid::Uuid::new_v4().to_string(),
        };
        runtime.publish();
        runtime
    }

    pub(crate) fn subscribe_view(&self) -> watch::Receiver<ConversationView> {
        self.view_tx.subscribe()
    }

    pub async fn run(mut self) {
        tracing::info!(
            session = %self.session_id,
            thread_id = ?self.context.thread_id,
            "Opening conversation"
        );

        self.start_refresh();
        self.publish();

        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,
                Some(inbound) = self.inbox_rx.recv() => {
                    self.handle(inbound);
                    self.publish();
                }
                else => break,
            }
        }

        if let Some(handle) = self.run_poll.take() {
            handle.cancel();
        }
        if let Some(handle) = self.refresh_poll.take() {
            handle.cancel();
        }
        tracing::info!(session = %self.session_id, "Conversation closed");
    }

    fn handle(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::SetDraft(text) => self.draft = text,
            Inbound::Send => {
                let draft = self.draft.clone();
                self.process_event(Event::Submit { draft });
            }
            Inbound::Machine(event) => self.process_event(event),
            Inbound::FetchStarted => self.fetches_in_flight += 1,
            Inbound::Fetched(result) => {
                self.fetches_in_flight = self.fetches_in_flight.saturating_sub(1);
                match result {
                    // Every list is a full snapshot; the last one to land wins
                    Ok(messages) => self.store.ingest(messages),
                    Err(e) => {
                        tracing::warn!(
                            session = %self.session_id,
                            error = %e,
                            "Message refresh failed"
                        );
                    }
                }
            }
        }
    }

    fn process_event(&mut self, event: Event) {
        let event_name = event.name();
        let cause = event.failure().map(ToString::to_string);
        match transition(&self.state, &self.context, event) {
            Ok(result) => {
                tracing::debug!(
                    session = %self.session_id,
                    event = event_name,
                    from = self.state.name(),
                    to = result.new_state.name(),
                    "Transition"
                );
                if let Some(outcome) = result.settled {
                    tracing::info!(
                        session = %self.session_id,
                        ?outcome,
                        cause = cause.as_deref(),
                        "Send settled"
                    );
                }
                self.state = result.new_state;
                for effect in result.effects {
                    self.execute_effect(effect);
                }
            }
            Err(TransitionError::Stale { state, event }) => {
                tracing::debug!(session = %self.session_id, state, event, "Ignoring stale event");
            }
            Err(e @ TransitionError::Rejected(_)) => {
                tracing::info!(session = %self.session_id, reason = %e, "Send rejected");
                self.notify(Notification::error(e.to_string()));
            }
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::CreateMessage { thread_id, text } => {
                let transport = self.transport.clone();
                let inbox = self.inbox_tx.clone();
                tokio::spawn(async move {
                    let created = transport.create_message(&thread_id, &text, Origin::User).await;
                    let event = match created {
                        Ok(message) => Event::MessageCreated { message },
                        Err(error) => {
                            tracing::warn!(%thread_id, error = %error, "Failed to create message");
                            Event::MessageFailed { error }
                        }
                    };
                    let _ = inbox.send(Inbound::Machine(event)).await;
                });
            }

            Effect::AppendMessage { message } => self.store.append(message),

            Effect::ClearDraft => self.draft.clear(),

            Effect::CreateRun {
                thread_id,
                assistant_id,
            } => {
                let transport = self.transport.clone();
                let inbox = self.inbox_tx.clone();
                tokio::spawn(async move {
                    let event = match transport.create_run(&thread_id, &assistant_id).await {
                        Ok(run) => {
                            tracing::info!(%thread_id, run_id = %run.id, "Run started");
                            Event::RunCreated { run }
                        }
                        Err(error) => {
                            tracing::warn!(%thread_id, error = %error, "Failed to start run");
                            Event::RunStartFailed { error }
                        }
                    };
                    let _ = inbox.send(Inbound::Machine(event)).await;
                });
            }

            Effect::StartRunPolling { thread_id, run_id } => {
                if let Some(previous) = self.run_poll.take() {
                    previous.cancel();
                }
                let transport = self.transport.clone();
                let inbox = self.inbox_tx.clone();
                self.run_poll = Some(polling::start(self.timing.run_poll_interval, move || {
                    let transport = transport.clone();
                    let inbox = inbox.clone();
                    let thread_id = thread_id.clone();
                    let run_id = run_id.clone();
                    async move {
                        let event = match transport.retrieve_run(&thread_id, &run_id).await {
                            Ok(run) => {
                                tracing::debug!(%run_id, status = %run.status, "Run polled");
                                Event::RunPolled { run }
                            }
                            Err(error) => {
                                tracing::warn!(%run_id, error = %error, "Failed to poll run");
                                Event::RunPollFailed { run_id, error }
                            }
                        };
                        let _ = inbox.send(Inbound::Machine(event)).await;
                    }
                }));
            }

            Effect::CancelRunPolling => {
                if let Some(handle) = self.run_poll.take() {
                    handle.cancel();
                }
            }

            Effect::RefreshMessages => self.spawn_fetch(),

            Effect::Notify(notification) => self.notify(notification),
        }
    }

    /// Load the thread now and keep refreshing it in the background
    fn start_refresh(&mut self) {
        let Some(period) = self.timing.refresh_interval else {
            return;
        };
        let Some(thread_id) = self.context.target().0.map(str::to_string) else {
            tracing::debug!(session = %self.session_id, "No thread, message refresh disabled");
            return;
        };

        self.spawn_fetch();

        let transport = self.transport.clone();
        let inbox = self.inbox_tx.clone();
        self.refresh_poll = Some(polling::start(period, move || {
            let transport = transport.clone();
            let inbox = inbox.clone();
            let thread_id = thread_id.clone();
            async move {
                if inbox.send(Inbound::FetchStarted).await.is_err() {
                    return;
                }
                let result = transport.list_messages(&thread_id).await;
                let _ = inbox.send(Inbound::Fetched(result)).await;
            }
        }));
    }

    /// One immediate full message refresh
    fn spawn_fetch(&mut self) {
        let Some(thread_id) = self.context.target().0.map(str::to_string) else {
            return;
        };
        self.fetches_in_flight += 1;
        let transport = self.transport.clone();
        let inbox = self.inbox_tx.clone();
        tokio::spawn(async move {
            let result = transport.list_messages(&thread_id).await;
            let _ = inbox.send(Inbound::Fetched(result)).await;
        });
    }

    fn notify(&self, notification: Notification) {
        if notification.is_error() {
            tracing::debug!(
                session = %self.session_id,
                text = %notification.text,
                "Error notification"
            );
        }
        // No subscribers is fine
        let _ = self.notify_tx.send(notification);
    }

    /// Publish the current projection if it changed
    fn publish(&self) {
        let view = ConversationView {
            messages: self.store.snapshot().to_vec(),
            fetching: self.fetches_in_flight > 0,
            sending: self.state.is_sending(),
            polling_run: self.state.is_polling_run(),
            draft: self.draft.clone(),
            thread_id: self.context.target().0.map(str::to_string),
            assistant_configured: self.context.target().1.is_some(),
        };
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}
