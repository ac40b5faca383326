//! HTTP GET with bounded exponential-backoff retry on rate limiting.
//!
//! Only HTTP 429 is retried. Every other failure (error status, timeout,
//! transport error, undecodable body) surfaces on the first occurrence.
//!
//! # Retry Strategy
//!
//! - 3 attempts total by default
//! - Delay before attempt k is `initial_delay × 2^(k-2)`: 2s, then 4s
//! - Each attempt is an independent request with its own timeout

use crate::domain::FetchError;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, warn};

/// Per-attempt request timeout in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Total attempts for a rate-limited request
pub const MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry, in milliseconds
pub const INITIAL_RETRY_DELAY_MS: u64 = 2000;

/// How many times and how patiently to retry a rate-limited request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each later attempt
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(INITIAL_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Delays to wait before each retry, in order: `initial_delay × 2^k`.
    pub fn backoff(&self) -> impl Iterator<Item = Duration> {
        // ExponentialBackoff::from_millis(2) yields 2^(k+1) × factor.
        let initial_ms = u64::try_from(self.initial_delay.as_millis()).unwrap_or(u64::MAX);
        ExponentialBackoff::from_millis(2)
            .factor(initial_ms)
            .map(|delay| delay / 2)
            .take(self.max_attempts.saturating_sub(1) as usize)
    }
}

/// Upstream HTTP client with rate-limit aware retry.
///
/// Holds no mutable state; clones share the underlying connection pool.
#[derive(Clone)]
pub struct RetryingFetcher {
    client: Client,
    base_url: String,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    /// Create a fetcher against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Transport` if the HTTP client cannot be built
    /// (e.g. TLS backend initialisation failure).
    pub fn new(
        base_url: &str,
        user_agent: &str,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// GET `endpoint` with `query` and decode the body as JSON.
    ///
    /// Retries only on HTTP 429, sleeping between attempts per the
    /// configured `RetryPolicy`.
    pub async fn fetch(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut backoff = self.policy.backoff();
        let mut attempt: u32 = 1;

        loop {
            match self.attempt(&url, endpoint, query).await {
                Err(FetchError::RateLimited) => match backoff.next() {
                    Some(delay) => {
                        warn!(
                            "Rate limited by upstream on {} (attempt {}/{}), retrying in {}ms",
                            endpoint,
                            attempt,
                            self.policy.max_attempts,
                            delay.as_millis()
                        );
                        metrics::counter!("upstream_retries_total", "endpoint" => endpoint.to_string())
                            .increment(1);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        warn!("Giving up on {} after {} rate-limited attempts", endpoint, attempt);
                        return Err(FetchError::RetriesExhausted { attempts: attempt });
                    }
                },
                other => return other,
            }
        }
    }

    /// One request, no retry.
    async fn attempt(&self, url: &str, endpoint: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        debug!("Fetching from upstream: {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        metrics::counter!(
            "upstream_requests_total",
            "endpoint" => endpoint.to_string(),
            "status" => status.as_u16().to_string()
        )
        .increment(1);

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
