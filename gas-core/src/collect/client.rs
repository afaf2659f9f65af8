//! HTTP hit sender backed by reqwest

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use super::TransportError;
use super::protocol::constants::FORM_CONTENT_TYPE;
use super::types::HitSender;
use crate::config::NetworkConfig;

/// HTTP hit sender implementation.
///
/// Posts form bodies to the collector and reports the status code. The
/// response body is never read.
#[derive(Debug, Clone)]
pub struct HttpHitSender {
    client: reqwest::Client,
}

impl HttpHitSender {
    /// Creates an HTTP sender using the network configuration for timeouts,
    /// user agent and redirect policy.
    ///
    /// # Errors
    ///
    /// - `TransportError::ClientSetup` - If the underlying HTTP client cannot be built
    pub fn new(config: &NetworkConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| TransportError::ClientSetup {
                reason: e.to_string(),
            })?;

        Ok(Self { client })
    }

    /// Wraps an existing client, e.g. one shared with the rest of an application.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn classify_error(url: &str, error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
            }
        } else {
            TransportError::ConnectionFailed {
                url: url.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl HitSender for HttpHitSender {
    /// Posts one hit and returns the collector's status code.
    ///
    /// Non-success statuses are returned, not converted into errors.
    ///
    /// # Errors
    /// - `TransportError::Timeout` - Request exceeded the configured timeout
    /// - `TransportError::ConnectionFailed` - Any other network failure
    async fn send(&self, url: &str, form_body: String) -> Result<u16, TransportError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(form_body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("HTTP request to {} failed: {}", url, e);
                Self::classify_error(url, &e)
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Collector {} answered with status {}", url, status);
        }

        Ok(status.as_u16())
    }
}
