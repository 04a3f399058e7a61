//! Presentation-facing projection of one open conversation

use crate::model::Message;
use serde::Serialize;
use std::fmt;

pub const PLACEHOLDER_FETCHING: &str = "Please wait for the messages to be fetched...";
pub const PLACEHOLDER_EMPTY: &str = "No messages";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A transient user-visible notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub text: String,
}

impl Notification {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            NotificationLevel::Success => write!(f, "[ok] {}", self.text),
            NotificationLevel::Error => write!(f, "[error] {}", self.text),
        }
    }
}

/// Everything the presentation layer renders
///
/// Rebuilt by the runtime after every store or controller change and
/// published through a watch channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationView {
    pub messages: Vec<Message>,
    /// A message list request is outstanding
    pub fetching: bool,
    /// A message or run is being created
    pub sending: bool,
    pub polling_run: bool,
    pub draft: String,
    pub thread_id: Option<String>,
    pub assistant_configured: bool,
}

impl ConversationView {
    /// Whether the send action is currently available
    pub fn can_send(&self) -> bool {
        self.thread_id.is_some()
            && self.assistant_configured
            && !self.sending
            && !self.polling_run
            && !self.draft.trim().is_empty()
    }

    /// Send button label
    pub fn status_label(&self) -> &'static str {
        if self.sending {
            "Sending..."
        } else if self.polling_run {
            "Polling..."
        } else {
            "Send"
        }
    }

    /// Text shown instead of the log when there is nothing to show
    pub fn placeholder(&self) -> Option<&'static str> {
        if !self.messages.is_empty() {
            None
        } else if self.fetching {
            Some(PLACEHOLDER_FETCHING)
        } else {
            Some(PLACEHOLDER_EMPTY)
        }
    }

    pub fn is_busy(&self) -> bool {
        self.sending || self.polling_run
    }
}
