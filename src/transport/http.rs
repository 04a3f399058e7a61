//! HTTP transport speaking the gateway's envelope protocol

use super::{Transport, TransportError};
use crate::assistants::PROVIDER_TIMEOUT;
use crate::model::{Message, Origin, Run};
use crate::wire::{
    CreateMessageRequest, CreateRunRequest, Envelope, ListMessagesRequest, MessageListResponse,
    MessageResponse, RetrieveRunRequest, RunResponse, ThreadResponse,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Outlasts the gateway's own provider timeout so a slow upstream call is
/// reported by the gateway instead of abandoned here
const REQUEST_TIMEOUT: Duration = PROVIDER_TIMEOUT.saturating_add(Duration::from_secs(30));

/// Transport backed by the gateway's `/api/...` routes
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[allow(dead_code)]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` to `path` and unwrap the envelope's payload
    async fn call<Req, Resp>(
        &self,
        path: &str,
        body: &Req,
        payload_name: &str,
    ) -> Result<Resp::Payload, TransportError>
    where
        Req: Serialize + Sync,
        Resp: Envelope + DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, "Transport request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::unreachable(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    TransportError::unreachable(format!("Connection failed: {e}"))
                } else {
                    TransportError::unreachable(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::unreachable(format!("Failed to read response: {e}")))?;

        let envelope: Resp = serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                TransportError::remote(format!("Malformed response: {e}"))
            } else {
                TransportError::remote(format!("HTTP {status}: {text}"))
            }
        })?;

        if !envelope.success() || !status.is_success() {
            let cause = envelope.error().unwrap_or("Unknown error").to_string();
            tracing::debug!(%url, %status, error = %cause, "Backend reported failure");
            return Err(TransportError::remote(cause));
        }

        envelope
            .into_payload()
            .ok_or_else(|| TransportError::remote(format!("No {payload_name} returned")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn create_thread(&self) -> Result<String, TransportError> {
        self.call::<_, ThreadResponse>("/api/thread/create", &serde_json::json!({}), "thread")
            .await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>, TransportError> {
        let request = ListMessagesRequest {
            thread_id: thread_id.to_string(),
        };
        let messages = self
            .call::<_, MessageListResponse>("/api/message/list", &request, "messages")
            .await?;
        Ok(messages.into_iter().map(Message::from).collect())
    }

    async fn create_message(
        &self,
        thread_id: &str,
        text: &str,
        origin: Origin,
    ) -> Result<Message, TransportError> {
        let request = CreateMessageRequest {
            message: text.to_string(),
            thread_id: thread_id.to_string(),
            from_user: Some(origin.as_metadata().into()),
        };
        let message = self
            .call::<_, MessageResponse>("/api/message/create", &request, "message")
            .await?;
        Ok(Message::from(message))
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, TransportError> {
        let request = CreateRunRequest {
            thread_id: thread_id.to_string(),
            assistant_id: assistant_id.to_string(),
        };
        let run = self
            .call::<_, RunResponse>("/api/run/create", &request, "run")
            .await?;
        Ok(Run::from(run))
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, TransportError> {
        let request = RetrieveRunRequest {
            thread_id: thread_id.to_string(),
            run_id: run_id.to_string(),
        };
        let run = self
            .call::<_, RunResponse>("/api/run/retrieve", &request, "run")
            .await?;
        Ok(Run::from(run))
    }
}
