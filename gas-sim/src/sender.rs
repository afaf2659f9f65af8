//! Simulated hit sender for deterministic testing

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use gas_core::collect::protocol::encoding::decode_form;
use gas_core::{HitSender, TransportError};
use parking_lot::Mutex;

/// Configuration for simulated collector responses
#[derive(Debug, Clone)]
pub struct ResponseConfig {
    /// Status code returned for every successful send
    pub status: u16,
    /// When set, every send fails with this message
    pub failure_message: Option<String>,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            status: 200,
            failure_message: None,
        }
    }
}

/// One request captured by the simulated sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub form_body: String,
}

impl RecordedRequest {
    /// Decodes the form body into ordered key/value pairs.
    pub fn params(&self) -> Vec<(String, String)> {
        decode_form(&self.form_body)
    }

    /// Returns the decoded value of `key`, if present.
    pub fn param(&self, key: &str) -> Option<String> {
        self.params()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// Simulated hit sender for deterministic testing and dry runs.
///
/// Records every request without network communication. Responses and
/// failures can be switched at runtime through a shared reference.
#[derive(Debug, Default)]
pub struct SimulatedHitSender {
    requests: Mutex<Vec<RecordedRequest>>,
    response_config: Mutex<ResponseConfig>,
    send_count: AtomicU32,
}

impl SimulatedHitSender {
    /// Creates a sender answering `200` to every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sender with custom response configuration.
    pub fn with_config(config: ResponseConfig) -> Self {
        Self {
            response_config: Mutex::new(config),
            ..Self::default()
        }
    }

    /// Answers subsequent sends with `status`.
    pub fn respond_with(&self, status: u16) {
        self.response_config.lock().status = status;
    }

    /// Makes every subsequent send fail with a connection error.
    pub fn simulate_failure(&self, failure_message: impl Into<String>) {
        self.response_config.lock().failure_message = Some(failure_message.into());
    }

    /// Resets to normal operation after a simulated failure.
    pub fn reset_to_normal(&self) {
        *self.response_config.lock() = ResponseConfig::default();
    }

    /// Returns number of send attempts, including failed ones.
    pub fn request_count(&self) -> u32 {
        self.send_count.load(Ordering::Relaxed)
    }

    /// Returns all successfully recorded requests in send order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }

    /// Forgets recorded requests and resets the attempt counter.
    pub fn clear(&self) {
        self.requests.lock().clear();
        self.send_count.store(0, Ordering::Relaxed);
    }
}

#[async_trait]
impl HitSender for SimulatedHitSender {
    /// Records the request and answers with the configured status.
    ///
    /// # Errors
    /// - `TransportError::ConnectionFailed` - When configured for failure simulation
    async fn send(&self, url: &str, form_body: String) -> Result<u16, TransportError> {
        self.send_count.fetch_add(1, Ordering::Relaxed);

        let config = self.response_config.lock().clone();
        if let Some(failure_msg) = config.failure_message {
            tracing::debug!("Simulated send to {} failing: {}", url, failure_msg);
            return Err(TransportError::ConnectionFailed {
                url: url.to_string(),
                reason: format!("Simulated collector failure: {failure_msg}"),
            });
        }

        self.requests.lock().push(RecordedRequest {
            url: url.to_string(),
            form_body,
        });

        Ok(config.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_requests() {
        let sender = SimulatedHitSender::new();
        let status = sender
            .send("http://collector.test/collect", "v=1&dp=%2F".to_string())
            .await
            .unwrap();

        assert_eq!(status, 200);
        assert_eq!(sender.request_count(), 1);
        let request = sender.last_request().unwrap();
        assert_eq!(request.url, "http://collector.test/collect");
        assert_eq!(request.param("dp").as_deref(), Some("/"));
        assert_eq!(request.param("missing"), None);
    }

    #[tokio::test]
    async fn test_failure_injection_and_reset() {
        let sender = SimulatedHitSender::new();
        sender.simulate_failure("collector down");

        let result = sender.send("http://collector.test/collect", String::new()).await;
        assert!(matches!(
            result,
            Err(TransportError::ConnectionFailed { reason, .. }) if reason.contains("collector down")
        ));
        assert_eq!(sender.request_count(), 1);
        assert!(sender.requests().is_empty());

        sender.reset_to_normal();
        assert!(sender.send("http://collector.test/collect", String::new()).await.is_ok());
        assert_eq!(sender.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_configured_status_passes_through() {
        let sender = SimulatedHitSender::with_config(ResponseConfig {
            status: 503,
            failure_message: None,
        });
        assert_eq!(sender.send("http://x/collect", String::new()).await.unwrap(), 503);

        sender.respond_with(204);
        assert_eq!(sender.send("http://x/collect", String::new()).await.unwrap(), 204);

        sender.clear();
        assert_eq!(sender.request_count(), 0);
        assert!(sender.last_request().is_none());
    }
}
