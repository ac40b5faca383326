//! Application configuration loaded from `config.yaml`.
//!
//! Every field has a default, so a partial file (or no file at all) yields a
//! working configuration pointed at the public CoinGecko API.

use crate::application::history_service::HISTORY_TTL;
use crate::application::snapshot_service::SNAPSHOT_TTL;
use crate::infrastructure::coingecko_client::{BASE_URL, USER_AGENT};
use crate::infrastructure::retrying_fetcher::{
    RetryPolicy, INITIAL_RETRY_DELAY_MS, MAX_ATTEMPTS, REQUEST_TIMEOUT_SECS,
};
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    /// Server configuration (host, port, CORS origins)
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream price API settings
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Cache freshness windows
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Server configuration settings.
///
/// Defines how the HTTP server should bind and what CORS origins to allow.
#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on (default: 3010)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Comma-separated list of allowed CORS origins (default: "*")
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
}

/// Upstream price API settings.
#[derive(Deserialize, Debug, Clone)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-attempt timeout in seconds (default: 15)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts for rate-limited requests (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds (default: 2000)
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,
}

/// Cache TTLs in seconds.
#[derive(Deserialize, Debug, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_snapshot_ttl_secs")]
    pub snapshot_ttl_secs: u64,
    #[serde(default = "default_history_ttl_secs")]
    pub history_ttl_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3010
}
fn default_allowed_origins() -> String {
    "*".to_string()
}
fn default_base_url() -> String {
    BASE_URL.to_string()
}
fn default_user_agent() -> String {
    USER_AGENT.to_string()
}
fn default_timeout_secs() -> u64 {
    REQUEST_TIMEOUT_SECS
}
fn default_max_attempts() -> u32 {
    MAX_ATTEMPTS
}
fn default_initial_retry_delay_ms() -> u64 {
    INITIAL_RETRY_DELAY_MS
}
fn default_snapshot_ttl_secs() -> u64 {
    SNAPSHOT_TTL.as_secs()
}
fn default_history_ttl_secs() -> u64 {
    HISTORY_TTL.as_secs()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            initial_retry_delay_ms: default_initial_retry_delay_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl_secs: default_snapshot_ttl_secs(),
            history_ttl_secs: default_history_ttl_secs(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_delay: Duration::from_millis(self.initial_retry_delay_ms),
        }
    }
}

impl CacheConfig {
    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }

    pub fn history_ttl(&self) -> Duration {
        Duration::from_secs(self.history_ttl_secs)
    }
}

impl Config {
    /// Parse a YAML configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse {} - check YAML syntax and structure", path.display()))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply `PORT` and `COINGECKO_BASE_URL` overrides from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var("PORT").ok().as_deref(),
            std::env::var("COINGECKO_BASE_URL").ok().as_deref(),
        );
    }

    fn apply_overrides(&mut self, port: Option<&str>, base_url: Option<&str>) {
        if let Some(port) = port.and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.upstream.base_url = url.trim().to_string();
        }
    }
}
