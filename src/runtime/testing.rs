//! Mock implementations for testing
//!
//! These mocks enable integration testing of the runtime without real I/O.

use super::{open_conversation, ConversationHandle, PollTiming};
use crate::model::{Message, Origin, Run};
use crate::state_machine::ConvContext;
use crate::transport::{Transport, TransportError};
use crate::view::{ConversationView, Notification};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};

// ============================================================================
// Mock Transport
// ============================================================================

/// A recorded transport call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateThread,
    ListMessages { thread_id: String },
    CreateMessage {
        thread_id: String,
        text: String,
        origin: Origin,
    },
    CreateRun {
        thread_id: String,
        assistant_id: String,
    },
    RetrieveRun { thread_id: String, run_id: String },
}

type Queue<T> = Mutex<VecDeque<Result<T, TransportError>>>;

/// Transport returning queued responses
///
/// Each queue hands out its responses in order and then keeps repeating the
/// last one, so a single queued poll result answers every later tick.
#[derive(Default)]
pub struct MockTransport {
    threads: Queue<String>,
    lists: Queue<Vec<Message>>,
    messages: Queue<Message>,
    runs: Queue<Run>,
    polls: Queue<Run>,
    list_delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every `list_messages` answer
    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    pub fn queue_thread(&self, response: Result<String, TransportError>) {
        self.threads.lock().unwrap().push_back(response);
    }

    pub fn queue_list(&self, response: Result<Vec<Message>, TransportError>) {
        self.lists.lock().unwrap().push_back(response);
    }

    pub fn queue_message(&self, response: Result<Message, TransportError>) {
        self.messages.lock().unwrap().push_back(response);
    }

    pub fn queue_run(&self, response: Result<Run, TransportError>) {
        self.runs.lock().unwrap().push_back(response);
    }

    pub fn queue_poll(&self, response: Result<Run, TransportError>) {
        self.polls.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn list_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::ListMessages { .. }))
    }

    pub fn poll_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::RetrieveRun { .. }))
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next<T: Clone>(queue: &Queue<T>, what: &str) -> Result<T, TransportError> {
        let mut queue = queue.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(TransportError::remote(format!("No {what} queued"))))
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn create_thread(&self) -> Result<String, TransportError> {
        self.record(Call::CreateThread);
        Self::next(&self.threads, "thread")
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>, TransportError> {
        self.record(Call::ListMessages {
            thread_id: thread_id.to_string(),
        });
        let response = Self::next(&self.lists, "messages");
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        response
    }

    async fn create_message(
        &self,
        thread_id: &str,
        text: &str,
        origin: Origin,
    ) -> Result<Message, TransportError> {
        self.record(Call::CreateMessage {
            thread_id: thread_id.to_string(),
            text: text.to_string(),
            origin,
        });
        Self::next(&self.messages, "message")
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, TransportError> {
        self.record(Call::CreateRun {
            thread_id: thread_id.to_string(),
            assistant_id: assistant_id.to_string(),
        });
        Self::next(&self.runs, "run")
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, TransportError> {
        self.record(Call::RetrieveRun {
            thread_id: thread_id.to_string(),
            run_id: run_id.to_string(),
        });
        Self::next(&self.polls, "run status")
    }
}

// ============================================================================
// Test Runtime
// ============================================================================

/// An open conversation over a [`MockTransport`]
pub struct TestRuntime {
    pub transport: Arc<MockTransport>,
    pub handle: ConversationHandle,
    pub views: watch::Receiver<ConversationView>,
    pub notifications: broadcast::Receiver<Notification>,
}

impl TestRuntime {
    pub fn new() -> TestRuntimeBuilder {
        TestRuntimeBuilder::new()
    }

    /// Set the draft and submit it
    pub async fn submit(&self, text: &str) {
        self.handle.set_draft(text).await.unwrap();
        self.handle.send().await.unwrap();
    }

    /// Wait until a published view satisfies `pred`
    pub async fn wait_for_view(
        &mut self,
        pred: impl FnMut(&ConversationView) -> bool,
        timeout: Duration,
    ) -> Option<ConversationView> {
        match tokio::time::timeout(timeout, self.views.wait_for(pred)).await {
            Ok(Ok(view)) => Some(view.clone()),
            _ => None,
        }
    }

    /// Wait for a notification satisfying `pred`, skipping others
    pub async fn wait_for_notification(
        &mut self,
        pred: impl Fn(&Notification) -> bool,
        timeout: Duration,
    ) -> Option<Notification> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.notifications.recv()).await {
                Ok(Ok(notification)) if pred(&notification) => return Some(notification),
                Ok(Ok(_) | Err(RecvError::Lagged(_))) => continue,
                Ok(Err(RecvError::Closed)) | Err(_) => return None,
            }
        }
    }

    /// Wait for a notification with exactly this text
    pub async fn wait_for_text(&mut self, text: &str, timeout: Duration) -> Option<Notification> {
        self.wait_for_notification(|n| n.text == text, timeout).await
    }
}

pub struct TestRuntimeBuilder {
    transport: MockTransport,
    thread_id: Option<String>,
    assistant_id: Option<String>,
    max_run_polls: Option<u32>,
    timing: PollTiming,
}

impl TestRuntimeBuilder {
    pub fn new() -> Self {
        Self {
            transport: MockTransport::new(),
            thread_id: Some("T1".to_string()),
            assistant_id: Some("asst_1".to_string()),
            max_run_polls: None,
            timing: PollTiming {
                run_poll_interval: Duration::from_millis(10),
                refresh_interval: None,
            },
        }
    }

    pub fn transport(mut self, transport: MockTransport) -> Self {
        self.transport = transport;
        self
    }

    pub fn thread_id(mut self, thread_id: Option<&str>) -> Self {
        self.thread_id = thread_id.map(str::to_string);
        self
    }

    pub fn assistant_id(mut self, assistant_id: Option<&str>) -> Self {
        self.assistant_id = assistant_id.map(str::to_string);
        self
    }

    pub fn max_run_polls(mut self, max: u32) -> Self {
        self.max_run_polls = Some(max);
        self
    }

    pub fn refresh_every(mut self, period: Duration) -> Self {
        self.timing.refresh_interval = Some(period);
        self
    }

    pub fn build(self) -> TestRuntime {
        let transport = Arc::new(self.transport);
        let context = ConvContext::new(self.thread_id, self.assistant_id)
            .with_max_run_polls(self.max_run_polls);
        let handle = open_conversation(transport.clone(), context, self.timing);
        let views = handle.subscribe_view();
        let notifications = handle.notifications();
        TestRuntime {
            transport,
            handle,
            views,
            notifications,
        }
    }
}

impl Default for TestRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunStatus;
    use crate::view::{NotificationLevel, PLACEHOLDER_EMPTY};
    use chrono::{TimeZone, Utc};

    const WAIT: Duration = Duration::from_secs(2);

    fn message(id: &str, secs: i64, text: &str, origin: Origin) -> Message {
        Message::new(id, Utc.timestamp_opt(secs, 0).unwrap(), text, origin)
    }

    fn m1() -> Message {
        message("1", 1_700_000_000, "hi", Origin::User)
    }

    fn m2() -> Message {
        message("2", 1_700_000_005, "Hello! How can I help?", Origin::Assistant)
    }

    fn run(status: RunStatus) -> Run {
        Run::new("r1", "T1", status)
    }

    fn ids(view: &ConversationView) -> Vec<&str> {
        view.messages.iter().map(|m| m.id.as_str()).collect()
    }

    fn settled(view: &ConversationView) -> bool {
        !view.sending && !view.polling_run
    }

    #[tokio::test]
    async fn test_send_poll_and_refresh() {
        let transport = MockTransport::new();
        transport.queue_message(Ok(m1()));
        transport.queue_run(Ok(run(RunStatus::Queued)));
        transport.queue_poll(Ok(run(RunStatus::InProgress)));
        transport.queue_poll(Ok(run(RunStatus::Completed)));
        // Newest first, as the provider lists them
        transport.queue_list(Ok(vec![m2(), m1()]));

        let mut rt = TestRuntime::new().transport(transport).build();
        rt.submit("hi").await;

        let sent = rt.wait_for_text("Message sent.", WAIT).await;
        assert_eq!(sent.unwrap().level, NotificationLevel::Success);

        let view = rt
            .wait_for_view(|v| v.messages.len() == 2 && settled(v), WAIT)
            .await
            .unwrap();
        assert_eq!(ids(&view), vec!["1", "2"]);
        assert_eq!(view.messages[0].origin, Origin::User);
        assert_eq!(view.messages[1].origin, Origin::Assistant);
        assert!(view.draft.is_empty());

        assert_eq!(rt.transport.list_calls(), 1);
        assert_eq!(rt.transport.poll_calls(), 2);
        assert_eq!(
            rt.transport.calls()[0],
            Call::CreateMessage {
                thread_id: "T1".to_string(),
                text: "hi".to_string(),
                origin: Origin::User,
            }
        );

        // The run loop is gone once the run completed
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(rt.transport.poll_calls(), 2);
        rt.handle.close().await;
    }

    #[tokio::test]
    async fn test_sent_message_visible_while_polling() {
        let transport = MockTransport::new();
        transport.queue_message(Ok(m1()));
        transport.queue_run(Ok(run(RunStatus::Queued)));
        transport.queue_poll(Ok(run(RunStatus::InProgress)));

        let mut rt = TestRuntime::new().transport(transport).build();
        rt.submit("hi").await;

        let view = rt
            .wait_for_view(|v| v.polling_run && v.messages.len() == 1, WAIT)
            .await
            .unwrap();
        assert_eq!(ids(&view), vec!["1"]);
        assert_eq!(view.status_label(), "Polling...");
        assert!(!view.can_send());
        assert_eq!(rt.transport.list_calls(), 0);
        rt.handle.close().await;
    }

    #[tokio::test]
    async fn test_run_start_failure_keeps_sent_message() {
        let transport = MockTransport::new();
        transport.queue_message(Ok(m1()));
        transport.queue_run(Err(TransportError::remote("Failed to create run")));

        let mut rt = TestRuntime::new().transport(transport).build();
        rt.submit("hi").await;

        let note = rt.wait_for_text("Failed to start run.", WAIT).await.unwrap();
        assert!(note.is_error());

        let view = rt.wait_for_view(settled, WAIT).await.unwrap();
        assert_eq!(ids(&view), vec!["1"]);
        assert!(view.draft.is_empty());
        assert_eq!(rt.transport.poll_calls(), 0);
    }

    #[tokio::test]
    async fn test_message_failure_preserves_draft() {
        let transport = MockTransport::new();
        transport.queue_message(Err(TransportError::unreachable("connection refused")));

        let mut rt = TestRuntime::new().transport(transport).build();
        rt.submit("hi").await;

        rt.wait_for_text("Failed to send message. Please try again.", WAIT)
            .await
            .unwrap();
        let view = rt.wait_for_view(settled, WAIT).await.unwrap();
        assert_eq!(view.draft, "hi");
        assert!(view.messages.is_empty());
        assert!(view.can_send());
        assert_eq!(
            rt.transport
                .count(|c| matches!(c, Call::CreateRun { .. })),
            0
        );
    }

    #[tokio::test]
    async fn test_blank_draft_makes_no_calls() {
        let mut rt = TestRuntime::new().build();
        rt.submit("  \n ").await;

        let note = rt
            .wait_for_notification(Notification::is_error, WAIT)
            .await
            .unwrap();
        assert_eq!(note.text, "Failed to send message. Message is empty");
        assert!(rt.transport.calls().is_empty());
        assert!(settled(&rt.handle.view()));
    }

    #[tokio::test]
    async fn test_send_without_thread_is_rejected() {
        let mut rt = TestRuntime::new().thread_id(None).build();
        rt.submit("hi").await;

        let note = rt
            .wait_for_notification(Notification::is_error, WAIT)
            .await
            .unwrap();
        assert_eq!(note.text, "Failed to send message. No active thread");
        assert!(rt.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_send_without_assistant_is_rejected() {
        let mut rt = TestRuntime::new().assistant_id(None).build();
        rt.submit("hi").await;

        let note = rt
            .wait_for_notification(Notification::is_error, WAIT)
            .await
            .unwrap();
        assert_eq!(note.text, "Failed to send message. No assistant configured");
        assert!(rt.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_run_skips_refresh() {
        let transport = MockTransport::new();
        transport.queue_message(Ok(m1()));
        transport.queue_run(Ok(run(RunStatus::Queued)));
        transport.queue_poll(Ok(run(RunStatus::InProgress)));
        let mut failed = run(RunStatus::Failed);
        failed.last_error = Some("Rate limit reached".to_string());
        transport.queue_poll(Ok(failed));

        let mut rt = TestRuntime::new().transport(transport).build();
        rt.submit("hi").await;

        rt.wait_for_text("Run failed! Rate limit reached", WAIT)
            .await
            .unwrap();
        let view = rt.wait_for_view(settled, WAIT).await.unwrap();
        assert_eq!(ids(&view), vec!["1"]);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(rt.transport.list_calls(), 0);
        assert_eq!(rt.transport.poll_calls(), 2);
    }

    #[tokio::test]
    async fn test_poll_failure_stops_loop() {
        let transport = MockTransport::new();
        transport.queue_message(Ok(m1()));
        transport.queue_run(Ok(run(RunStatus::Queued)));
        transport.queue_poll(Err(TransportError::unreachable("timed out")));

        let mut rt = TestRuntime::new().transport(transport).build();
        rt.submit("hi").await;

        rt.wait_for_text("Failed to poll run status.", WAIT)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(rt.transport.poll_calls(), 1);
        assert!(settled(&rt.handle.view()));
    }

    #[tokio::test]
    async fn test_poll_ceiling_gives_up() {
        let transport = MockTransport::new();
        transport.queue_message(Ok(m1()));
        transport.queue_run(Ok(run(RunStatus::Queued)));
        transport.queue_poll(Ok(run(RunStatus::InProgress)));

        let mut rt = TestRuntime::new()
            .transport(transport)
            .max_run_polls(3)
            .build();
        rt.submit("hi").await;

        let note = rt
            .wait_for_notification(|n| n.text.starts_with("Gave up"), WAIT)
            .await
            .unwrap();
        assert!(note.is_error());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(rt.transport.poll_calls(), 3);
        assert!(settled(&rt.handle.view()));
    }

    #[tokio::test]
    async fn test_submit_while_polling_is_rejected() {
        let transport = MockTransport::new();
        transport.queue_message(Ok(m1()));
        transport.queue_run(Ok(run(RunStatus::Queued)));
        transport.queue_poll(Ok(run(RunStatus::InProgress)));

        let mut rt = TestRuntime::new().transport(transport).build();
        rt.submit("hi").await;
        rt.wait_for_view(|v| v.polling_run, WAIT).await.unwrap();

        rt.submit("again").await;
        rt.wait_for_text(
            "Failed to send message. A message is already being sent",
            WAIT,
        )
        .await
        .unwrap();
        assert_eq!(
            rt.transport
                .count(|c| matches!(c, Call::CreateMessage { .. })),
            1
        );
        // The rejected draft is left for a later retry
        assert_eq!(rt.handle.view().draft, "again");
        rt.handle.close().await;
    }

    #[tokio::test]
    async fn test_refresh_loop_picks_up_new_messages() {
        let transport = MockTransport::new();
        transport.queue_list(Ok(vec![m1()]));
        transport.queue_list(Ok(vec![m2(), m1()]));

        let mut rt = TestRuntime::new()
            .transport(transport)
            .refresh_every(Duration::from_millis(10))
            .build();

        let view = rt
            .wait_for_view(|v| v.messages.len() == 2, WAIT)
            .await
            .unwrap();
        assert_eq!(ids(&view), vec!["1", "2"]);
        assert!(rt.transport.list_calls() >= 2);
        rt.handle.close().await;
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_store() {
        let transport = MockTransport::new();
        transport.queue_list(Ok(vec![m1()]));
        transport.queue_list(Err(TransportError::unreachable("offline")));

        let mut rt = TestRuntime::new()
            .transport(transport)
            .refresh_every(Duration::from_millis(10))
            .build();

        rt.wait_for_view(|v| v.messages.len() == 1, WAIT)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rt.transport.list_calls() >= 3);
        assert_eq!(ids(&rt.handle.view()), vec!["1"]);
        rt.handle.close().await;
    }

    #[tokio::test]
    async fn test_fetching_flag_and_placeholder() {
        let transport = MockTransport::new().with_list_delay(Duration::from_millis(50));
        transport.queue_list(Ok(vec![]));

        let mut rt = TestRuntime::new()
            .transport(transport)
            .refresh_every(Duration::from_secs(60))
            .build();

        let view = rt.wait_for_view(|v| v.fetching, WAIT).await.unwrap();
        assert_eq!(view.placeholder(), Some(crate::view::PLACEHOLDER_FETCHING));

        let view = rt.wait_for_view(|v| !v.fetching, WAIT).await.unwrap();
        assert_eq!(view.placeholder(), Some(PLACEHOLDER_EMPTY));
        rt.handle.close().await;
    }

    #[tokio::test]
    async fn test_close_stops_refresh() {
        let transport = MockTransport::new();
        transport.queue_list(Ok(vec![m1()]));

        let mut rt = TestRuntime::new()
            .transport(transport)
            .refresh_every(Duration::from_millis(10))
            .build();
        rt.wait_for_view(|v| v.messages.len() == 1, WAIT)
            .await
            .unwrap();

        let transport = rt.transport.clone();
        rt.handle.close().await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        let after_close = transport.list_calls();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(transport.list_calls(), after_close);
    }

    #[tokio::test]
    async fn test_empty_thread_id_disables_refresh() {
        let rt = TestRuntime::new()
            .thread_id(Some(""))
            .refresh_every(Duration::from_millis(10))
            .build();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(rt.transport.list_calls(), 0);
        assert!(!rt.handle.view().fetching);
    }

    #[tokio::test]
    async fn test_handle_fails_after_runtime_stops() {
        let rt = TestRuntime::new().build();
        rt.handle.shutdown.cancel();
        let mut views = rt.handle.subscribe_view();
        // The actor drops its sender side when it exits
        let _ = tokio::time::timeout(WAIT, views.changed()).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rt.handle.send().await.is_err());
    }
}
