//! `OpenAI` Assistants v2 implementation

use super::{AssistantsError, AssistantsService};
use crate::wire::{MessageObject, RunObject, ThreadObject, FROM_USER_KEY};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Largest page the messages endpoint hands out
const MESSAGE_PAGE_LIMIT: u32 = 100;

/// Upper bound on one provider request
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the threads/messages/runs endpoints
pub struct OpenAIAssistants {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIAssistants {
    pub fn new(api_key: String, base_url: Option<&str>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(PROVIDER_TIMEOUT).build()?;
        let base_url = base_url
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", "assistants=v2")
    }

    /// Send a request and decode a JSON body, classifying failures
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, AssistantsError> {
        let response = self.authorized(request).send().await.map_err(|e| {
            if e.is_timeout() {
                AssistantsError::network(format!("Request timeout: {e}"))
            } else if e.is_connect() {
                AssistantsError::network(format!("Connection failed: {e}"))
            } else {
                AssistantsError::unknown(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AssistantsError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error_resp) = serde_json::from_str::<OpenAIErrorResponse>(&body) {
                return Err(AssistantsError::from_status(
                    status.as_u16(),
                    &error_resp.error.message,
                ));
            }
            return Err(AssistantsError::from_status(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            AssistantsError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })
    }
}

#[async_trait]
impl AssistantsService for OpenAIAssistants {
    async fn create_thread(&self) -> Result<ThreadObject, AssistantsError> {
        let request = self
            .client
            .post(self.url("/threads"))
            .json(&serde_json::json!({}));
        self.send(request).await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<MessageObject>, AssistantsError> {
        let request = self
            .client
            .get(self.url(&format!("/threads/{thread_id}/messages")))
            .query(&[
                ("limit", MESSAGE_PAGE_LIMIT.to_string()),
                // Ties on created_at keep creation order
                ("order", "asc".to_string()),
            ]);
        let page: OpenAIList<MessageObject> = self.send(request).await?;
        Ok(page.data)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        text: &str,
        from_user: &str,
    ) -> Result<MessageObject, AssistantsError> {
        let body = CreateMessageBody {
            role: "user",
            content: text,
            metadata: HashMap::from([(FROM_USER_KEY, from_user)]),
        };
        let request = self
            .client
            .post(self.url(&format!("/threads/{thread_id}/messages")))
            .json(&body);
        self.send(request).await
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunObject, AssistantsError> {
        let request = self
            .client
            .post(self.url(&format!("/threads/{thread_id}/runs")))
            .json(&CreateRunBody { assistant_id });
        self.send(request).await
    }

    async fn retrieve_run(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<RunObject, AssistantsError> {
        let request = self
            .client
            .get(self.url(&format!("/threads/{thread_id}/runs/{run_id}")));
        self.send(request).await
    }
}

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Serialize)]
struct CreateMessageBody<'a> {
    role: &'static str,
    content: &'a str,
    metadata: HashMap<&'static str, &'a str>,
}

#[derive(Debug, Serialize)]
struct CreateRunBody<'a> {
    assistant_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAIList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}
