use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use serqet_core::config::BrainConfig;
use serqet_core::domain::conversation::HistoryEntry;
use serqet_core::domain::intent::{IntentRequest, IntentResponse};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntentClientError {
    #[error("intent resolver unavailable: {0}")]
    Unavailable(String),
    #[error("intent resolver returned a malformed response: {0}")]
    Malformed(String),
}

/// Bridge to the external intent resolver.
#[async_trait]
pub trait IntentClient: Send + Sync {
    async fn resolve(
        &self,
        user_id: &str,
        query: &str,
        history: &[HistoryEntry],
    ) -> Result<IntentResponse, IntentClientError>;
}

/// JSON-over-HTTP resolver client. One POST per call, bounded by the client
/// timeout, never retried.
#[derive(Clone, Debug)]
pub struct HttpIntentClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpIntentClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint: endpoint.into(), timeout })
    }

    pub fn from_config(config: &BrainConfig) -> Result<Self, reqwest::Error> {
        Self::new(config.intent_url(), Duration::from_secs(config.timeout_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn unavailable(&self, error: reqwest::Error) -> IntentClientError {
        if error.is_timeout() {
            return IntentClientError::Unavailable(format!(
                "no response from `{}` within {}ms",
                self.endpoint,
                self.timeout.as_millis()
            ));
        }
        IntentClientError::Unavailable(format!("request to `{}` failed: {error}", self.endpoint))
    }
}

#[async_trait]
impl IntentClient for HttpIntentClient {
    async fn resolve(
        &self,
        user_id: &str,
        query: &str,
        history: &[HistoryEntry],
    ) -> Result<IntentResponse, IntentClientError> {
        let request = IntentRequest {
            user_id: user_id.to_string(),
            query: query.to_string(),
            history: history.to_vec(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|error| self.unavailable(error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IntentClientError::Unavailable(format!(
                "`{}` responded with status {status}",
                self.endpoint
            )));
        }

        let body = response.bytes().await.map_err(|error| self.unavailable(error))?;
        debug!(
            event_name = "agent.brain.response_received",
            endpoint = %self.endpoint,
            bytes = body.len(),
            "intent resolver responded"
        );

        let value: Value = serde_json::from_slice(&body)
            .map_err(|error| IntentClientError::Malformed(error.to_string()))?;
        IntentResponse::from_loose_value(value)
            .ok_or_else(|| IntentClientError::Malformed("expected a JSON object".to_string()))
    }
}
