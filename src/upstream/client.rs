//! Bounded HTTP fetcher for upstream collaborators.

use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::observability::metrics;
use crate::upstream::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream connection failed: {0}")]
    Connect(String),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("failed to read upstream body: {0}")]
    Body(String),

    #[error("failed to build upstream client: {0}")]
    Client(String),
}

impl UpstreamError {
    /// Connection failures and 5xx responses are worth another attempt.
    /// Timeouts are not: the caller has already waited the full deadline.
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::Connect(_) => true,
            UpstreamError::Status(code) => *code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else if e.is_body() || e.is_decode() {
            UpstreamError::Body(e.to_string())
        } else {
            UpstreamError::Connect(e.to_string())
        }
    }
}

#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl UpstreamClient {
    pub fn new(upstream: &UpstreamConfig, timeouts: &TimeoutConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.upstream_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .user_agent(upstream.user_agent.clone())
            .build()
            .map_err(|e| UpstreamError::Client(e.to_string()))?;

        Ok(Self {
            http,
            retry: RetryPolicy::from_config(&upstream.retries),
        })
    }

    /// GET `target?params`, retrying transient failures.
    ///
    /// Non-JSON bodies are returned as a JSON string.
    pub async fn fetch(
        &self,
        route: &str,
        target: &Url,
        params: &[(String, String)],
    ) -> Result<Value, UpstreamError> {
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.fetch_once(target, params).await {
                Ok(body) => {
                    metrics::record_upstream(route, "ok", start);
                    return Ok(body);
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    tracing::info!(
                        route = %route,
                        attempt,
                        delay = ?delay,
                        error = %e,
                        "Retrying upstream request"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    metrics::record_upstream(
                        route,
                        if matches!(e, UpstreamError::Timeout) { "timeout" } else { "error" },
                        start,
                    );
                    return Err(e);
                }
            }
        }
    }

    async fn fetch_once(
        &self,
        target: &Url,
        params: &[(String, String)],
    ) -> Result<Value, UpstreamError> {
        let response = self.http.get(target.clone()).query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(UpstreamError::Connect("refused".into()).is_retryable());
        assert!(UpstreamError::Status(502).is_retryable());
        assert!(!UpstreamError::Status(404).is_retryable());
        assert!(!UpstreamError::Timeout.is_retryable());
    }

    #[tokio::test]
    async fn test_connection_refused_is_reported() {
        let mut upstream = UpstreamConfig::default();
        upstream.retries.max_attempts = 1;
        let client = UpstreamClient::new(&upstream, &TimeoutConfig::default()).unwrap();

        // Port 9 (discard) on loopback is closed in test environments.
        let target = Url::parse("http://127.0.0.1:9/nothing").unwrap();
        let err = client.fetch("test", &target, &[]).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Connect(_) | UpstreamError::Timeout));
    }
}
