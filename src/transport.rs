//! Request/response boundary to the conversation backend
//!
//! Every operation is one outbound request. Nothing here retries; the
//! controller decides what a failure means.

pub mod http;

pub use http::HttpTransport;

use crate::model::{Message, Origin, Run};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Where a transport failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request never got an answer (connect, timeout, I/O)
    Unreachable,
    /// The backend answered and reported a failure
    Remote,
}

/// A failed transport call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Unreachable,
            message: message.into(),
        }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Remote,
            message: message.into(),
        }
    }

    #[allow(dead_code)] // Distinguishes the two failure sources for callers that care
    pub fn reached_remote(&self) -> bool {
        self.kind == TransportErrorKind::Remote
    }
}

/// The backend operations a conversation needs
#[async_trait]
pub trait Transport: Send + Sync {
    /// Create a new, empty thread
    async fn create_thread(&self) -> Result<String, TransportError>;

    /// All messages currently on a thread, in whatever order the backend returns
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>, TransportError>;

    /// Add a message to a thread
    async fn create_message(
        &self,
        thread_id: &str,
        text: &str,
        origin: Origin,
    ) -> Result<Message, TransportError>;

    /// Start an assistant run on a thread
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, TransportError>;

    /// Current state of a run
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn create_thread(&self) -> Result<String, TransportError> {
        (**self).create_thread().await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>, TransportError> {
        (**self).list_messages(thread_id).await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        text: &str,
        origin: Origin,
    ) -> Result<Message, TransportError> {
        (**self).create_message(thread_id, text, origin).await
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, TransportError> {
        (**self).create_run(thread_id, assistant_id).await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, TransportError> {
        (**self).retrieve_run(thread_id, run_id).await
    }
}
