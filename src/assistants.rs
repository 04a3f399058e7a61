//! Hosted assistant provider
//!
//! The gateway talks to the provider through [`AssistantsService`] so the
//! HTTP surface can be exercised without network access.

mod error;
mod openai;


pub use error::{AssistantsError, AssistantsErrorKind};
pub use openai::{OpenAIAssistants, DEFAULT_BASE_URL, PROVIDER_TIMEOUT};

use crate::wire::{MessageObject, RunObject, ThreadObject};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Thread, message and run operations of the provider
#[async_trait]
pub trait AssistantsService: Send + Sync {
    async fn create_thread(&self) -> Result<ThreadObject, AssistantsError>;

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<MessageObject>, AssistantsError>;

    /// Create a `user`-role message; `from_user` is stored verbatim in metadata
    async fn create_message(
        &self,
        thread_id: &str,
        text: &str,
        from_user: &str,
    ) -> Result<MessageObject, AssistantsError>;

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunObject, AssistantsError>;

    async fn retrieve_run(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<RunObject, AssistantsError>;
}

/// Logging wrapper for provider calls
pub struct LoggingService {
    inner: Arc<dyn AssistantsService>,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn AssistantsService>) -> Self {
        Self { inner }
    }

    fn record<T>(operation: &str, started: Instant, result: &Result<T, AssistantsError>) {
        let duration = started.elapsed();
        match result {
            Ok(_) => {
                tracing::info!(
                    operation,
                    duration_ms = %duration.as_millis(),
                    "Provider request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    operation,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Provider request failed"
                );
            }
        }
    }
}

#[async_trait]
impl AssistantsService for LoggingService {
    async fn create_thread(&self) -> Result<ThreadObject, AssistantsError> {
        let start = Instant::now();
        let result = self.inner.create_thread().await;
        Self::record("create_thread", start, &result);
        result
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<MessageObject>, AssistantsError> {
        let start = Instant::now();
        let result = self.inner.list_messages(thread_id).await;
        Self::record("list_messages", start, &result);
        result
    }

    async fn create_message(
        &self,
        thread_id: &str,
        text: &str,
        from_user: &str,
    ) -> Result<MessageObject, AssistantsError> {
        let start = Instant::now();
        let result = self.inner.create_message(thread_id, text, from_user).await;
        Self::record("create_message", start, &result);
        result
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunObject, AssistantsError> {
        let start = Instant::now();
        let result = self.inner.create_run(thread_id, assistant_id).await;
        Self::record("create_run", start, &result);
        result
    }

    async fn retrieve_run(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<RunObject, AssistantsError> {
        let start = Instant::now();
        let result = self.inner.retrieve_run(thread_id, run_id).await;
        Self::record("retrieve_run", start, &result);
        result
    }
}
