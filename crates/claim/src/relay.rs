use async_trait::async_trait;
use giftlock_ledger::PlannedCall;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay request failed: {0}")]
    Http(String),

    #[error("relay rejected the claim: {0}")]
    Rejected(String),

    #[error("relay request timed out")]
    Timeout,
}

/// Gasless claim submission. The relay signs and submits the claim call on
/// the recipient's behalf and reports the outcome through a webhook
/// callback keyed by the returned task id.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Submit a claim call; returns the relay's task id.
    async fn submit(&self, call: &PlannedCall) -> Result<String, RelayError>;
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    target: &'a str,
    /// Hex-encoded calldata
    data: String,
    value: String,
    description: &'a str,
}

#[derive(Deserialize)]
struct SubmitResponse {
    task_id: String,
}

/// REST client for the relay service.
pub struct HttpRelay {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpRelay {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Http(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl RelayClient for HttpRelay {
    async fn submit(&self, call: &PlannedCall) -> Result<String, RelayError> {
        let url = format!("{}/v1/claims", self.endpoint.trim_end_matches('/'));
        let request = SubmitRequest {
            target: &call.target,
            data: call.encoded_hex(),
            value: call.value.to_string(),
            description: &call.description,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RelayError::Timeout
                } else {
                    RelayError::Http(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Rejected(format!("{status}: {body}")));
        }

        let parsed: SubmitResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Http(e.to_string()))?;

        info!(task_id = %parsed.task_id, target = %call.target, "claim submitted to relay");
        Ok(parsed.task_id)
    }
}

#[derive(Default)]
struct MockRelayState {
    next_id: u64,
    should_fail: bool,
    submissions: Vec<PlannedCall>,
}

/// In-memory relay with deterministic task ids, for tests and for running
/// the claim flow without network dependencies.
#[derive(Clone, Default)]
pub struct MockRelay {
    state: Arc<RwLock<MockRelayState>>,
}

impl MockRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_should_fail(&self, fail: bool) {
        self.state.write().await.should_fail = fail;
    }

    pub async fn submissions(&self) -> Vec<PlannedCall> {
        self.state.read().await.submissions.clone()
    }
}

#[async_trait]
impl RelayClient for MockRelay {
    async fn submit(&self, call: &PlannedCall) -> Result<String, RelayError> {
        let mut state = self.state.write().await;
        if state.should_fail {
            return Err(RelayError::Http("mock relay failure".to_string()));
        }
        state.next_id += 1;
        state.submissions.push(call.clone());
        let task_id = format!("relay-task-{:04}", state.next_id);
        debug!(task_id = %task_id, "mock relay accepted claim");
        Ok(task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use giftlock_ledger::LedgerMsg;

    fn claim_call() -> PlannedCall {
        PlannedCall::new(
            "0xescrow",
            LedgerMsg::claim_with_code("XYZ"),
            0,
            "claim gift pack",
        )
    }

    #[tokio::test]
    async fn test_mock_relay_ids_are_deterministic() {
        let relay = MockRelay::new();
        assert_eq!(relay.submit(&claim_call()).await.unwrap(), "relay-task-0001");
        assert_eq!(relay.submit(&claim_call()).await.unwrap(), "relay-task-0002");
        assert_eq!(relay.submissions().await.len(), 2);
    }

    #[tokio::test]
    async fn test_mock_relay_failure() {
        let relay = MockRelay::new();
        relay.set_should_fail(true).await;
        let result = relay.submit(&claim_call()).await;
        assert!(matches!(result, Err(RelayError::Http(_))));
        assert!(relay.submissions().await.is_empty());
    }
}
