use crate::core::moderation::{CheckMessageRequest, ScoringApi, ScoringError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Minimal CleanTalk moderation API client. One POST per check, no retries.
pub struct CleanTalkClient {
    client: Client,
    endpoint: String,
}

impl CleanTalkClient {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ScoringError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| ScoringError::Transport(e.to_string()))?;

        Ok(Self::with_client(client, endpoint))
    }

    /// Wrap an already configured HTTP client.
    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Decode a response body. Anything that isn't JSON is malformed.
    fn parse_body(text: &str) -> Result<Value, ScoringError> {
        serde_json::from_str(text).map_err(|e| ScoringError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl ScoringApi for CleanTalkClient {
    async fn check_message(&self, request: &CheckMessageRequest) -> Result<Value, ScoringError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| ScoringError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ScoringError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ScoringError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Self::parse_body(&text)
    }
}
