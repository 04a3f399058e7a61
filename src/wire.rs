//! Wire formats
//!
//! Two layers share these types: the gateway serializes them and the HTTP
//! transport deserializes them. Provider objects (`MessageObject`,
//! `RunObject`) pass through the gateway untouched apart from dropping
//! fields nobody reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Metadata key carrying the message origin
pub const FROM_USER_KEY: &str = "fromUser";

// ============================================================================
// Provider objects
// ============================================================================

/// A thread message as returned by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageObject {
    pub id: String,
    /// Unix seconds
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Vec<ContentPart>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl MessageObject {
    /// Metadata value under `key`, if it is a string
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

/// One content part of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: TextValue,
    },
    /// Image files, image urls and anything added to the API later
    #[serde(other)]
    Unsupported,
}

impl ContentPart {
    pub fn text(value: impl Into<String>) -> Self {
        ContentPart::Text {
            text: TextValue {
                value: value.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextValue {
    pub value: String,
}

/// A run as returned by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunObject {
    pub id: String,
    pub thread_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<RunErrorObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunErrorObject {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

/// A freshly created thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadObject {
    pub id: String,
}

// ============================================================================
// Envelope requests
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesRequest {
    #[serde(default)]
    pub thread_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub thread_id: String,
    /// Browsers send `"true"`, older callers a bare boolean
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_user: Option<Value>,
}

impl CreateMessageRequest {
    /// The metadata string stored with the message
    pub fn from_user_flag(&self) -> String {
        match &self.from_user {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "false".to_string(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRunRequest {
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub assistant_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveRunRequest {
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub run_id: String,
}

// ============================================================================
// Envelope responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageListResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<MessageObject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<RunObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Uniform access to the `success` / `error` half of every envelope
pub trait Envelope {
    type Payload;

    fn success(&self) -> bool;
    fn error(&self) -> Option<&str>;
    fn into_payload(self) -> Option<Self::Payload>;
    fn ok(payload: Self::Payload) -> Self;
    fn failure(error: impl Into<String>) -> Self;
}

macro_rules! envelope {
    ($ty:ident, $field:ident, $payload:ty) => {
        impl Envelope for $ty {
            type Payload = $payload;

            fn success(&self) -> bool {
                self.success
            }

            fn error(&self) -> Option<&str> {
                self.error.as_deref()
            }

            fn into_payload(self) -> Option<$payload> {
                self.$field
            }

            fn ok(payload: $payload) -> Self {
                Self {
                    success: true,
                    $field: Some(payload),
                    error: None,
                }
            }

            fn failure(error: impl Into<String>) -> Self {
                Self {
                    success: false,
                    $field: None,
                    error: Some(error.into()),
                }
            }
        }
    };
}

envelope!(MessageListResponse, messages, Vec<MessageObject>);
envelope!(MessageResponse, message, MessageObject);
envelope!(RunResponse, run, RunObject);
envelope!(ThreadResponse, thread_id, String);
