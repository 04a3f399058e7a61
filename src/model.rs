//! Conversation domain types
//!
//! Wire objects are decoded into these right after they cross the transport
//! boundary; nothing past the transport looks at raw metadata strings.

use crate::wire::{ContentPart, MessageObject, RunObject, FROM_USER_KEY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    User,
    Assistant,
}

impl Origin {
    /// Decode the `fromUser` metadata value. Only the exact strings `"true"`
    /// and `"True"` mark a user message.
    pub fn from_metadata(flag: Option<&str>) -> Self {
        match flag {
            Some("true" | "True") => Origin::User,
            _ => Origin::Assistant,
        }
    }

    /// Encode for the `fromUser` metadata field
    pub fn as_metadata(self) -> &'static str {
        match self {
            Origin::User => "true",
            Origin::Assistant => "false",
        }
    }
}

/// A message in a conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Text of the leading content part; `None` when it is not text
    pub text: Option<String>,
    pub origin: Origin,
}

impl Message {
    #[allow(dead_code)] // Constructor for tests and local fixtures
    pub fn new(
        id: impl Into<String>,
        created_at: DateTime<Utc>,
        text: impl Into<String>,
        origin: Origin,
    ) -> Self {
        Self {
            id: id.into(),
            created_at,
            text: Some(text.into()),
            origin,
        }
    }

    /// Whether the message belongs in the presented log
    pub fn is_presentable(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// Text content split into display lines
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.as_deref().unwrap_or_default().split('\n')
    }
}

impl From<MessageObject> for Message {
    fn from(obj: MessageObject) -> Self {
        let origin = Origin::from_metadata(obj.metadata_str(FROM_USER_KEY));
        let created_at = DateTime::from_timestamp(obj.created_at, 0).unwrap_or_default();
        let text = match obj.content.into_iter().next() {
            Some(ContentPart::Text { text }) => Some(text.value),
            Some(ContentPart::Unsupported) | None => None,
        };
        Self {
            id: obj.id,
            created_at,
            text,
            origin,
        }
    }
}

/// Run status as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Expired,
    Incomplete,
    Completed,
    Failed,
    /// Any value this client does not know about
    Other(String),
}

impl RunStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "requires_action" => RunStatus::RequiresAction,
            "cancelling" => RunStatus::Cancelling,
            "cancelled" => RunStatus::Cancelled,
            "expired" => RunStatus::Expired,
            "incomplete" => RunStatus::Incomplete,
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            other => RunStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Other(s) => s,
        }
    }

    /// Only `completed` and `failed` end a poll loop
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One assistant-processing invocation on a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
    /// Provider explanation when the run failed
    pub last_error: Option<String>,
}

impl Run {
    #[allow(dead_code)] // Constructor for tests and local fixtures
    pub fn new(id: impl Into<String>, thread_id: impl Into<String>, status: RunStatus) -> Self {
        Self {
            id: id.into(),
            thread_id: thread_id.into(),
            status,
            last_error: None,
        }
    }
}

impl From<RunObject> for Run {
    fn from(obj: RunObject) -> Self {
        Self {
            id: obj.id,
            thread_id: obj.thread_id,
            status: RunStatus::parse(&obj.status),
            last_error: obj.last_error.map(|e| e.message),
        }
    }
}
