//! Upstream fetch errors.

use thiserror::Error;

/// Failure while fetching or decoding upstream data.
#[derive(Error, Debug)]
pub enum FetchError {
    /// A single attempt was answered with HTTP 429.
    #[error("Rate limited by upstream (HTTP 429)")]
    RateLimited,

    #[error("Still rate limited after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("Upstream error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Timeout waiting for upstream response")]
    Timeout,

    #[error("Request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Malformed upstream payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Coarse classification used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Retryable rate limit; only seen inside the retry loop
    TransientRateLimit,
    /// Timeout, network failure, error status, exhausted retries or bad payload
    UpstreamUnavailable,
    /// Payload decoded but lacks required data
    Validation,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::RateLimited => ErrorKind::TransientRateLimit,
            FetchError::Validation(_) => ErrorKind::Validation,
            FetchError::RetriesExhausted { .. }
            | FetchError::Status { .. }
            | FetchError::Timeout
            | FetchError::Transport(_)
            | FetchError::Decode(_) => ErrorKind::UpstreamUnavailable,
        }
    }

    /// HTTP status carried by the failure, if the upstream answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::RateLimited | FetchError::RetriesExhausted { .. } => Some(429),
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(err)
        }
    }
}
