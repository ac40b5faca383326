//! HTTP client for the CoinGecko public API.
//!
//! This client is used for fetching fresh data when the application caches
//! miss. Retry and timeout handling live in `RetryingFetcher`.

use crate::domain::{Asset, FetchError, Granularity, MarketDataSource};
use crate::infrastructure::retrying_fetcher::{RetryPolicy, RetryingFetcher, REQUEST_TIMEOUT_SECS};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::info;

/// Base URL for CoinGecko API
pub const BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// User-Agent sent with every upstream request
pub const USER_AGENT: &str = "CryptoHub Dashboard";

/// CoinGecko API client
#[derive(Clone)]
pub struct CoinGeckoClient {
    fetcher: RetryingFetcher,
}

impl CoinGeckoClient {
    /// Create a client with the default base URL, timeout and retry policy
    pub fn new() -> Result<Self, FetchError> {
        let fetcher = RetryingFetcher::new(
            BASE_URL,
            USER_AGENT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            RetryPolicy::default(),
        )?;
        Ok(Self::with_fetcher(fetcher))
    }

    /// Create a client over a preconfigured fetcher (custom base URL, testing)
    pub fn with_fetcher(fetcher: RetryingFetcher) -> Self {
        Self { fetcher }
    }

    pub fn base_url(&self) -> &str {
        self.fetcher.base_url()
    }

    /// Query parameters for `/simple/price`.
    pub fn simple_price_query(assets: &[Asset]) -> Vec<(&'static str, String)> {
        let ids = assets
            .iter()
            .map(Asset::coin_id)
            .collect::<Vec<_>>()
            .join(",");

        vec![
            ("ids", ids),
            ("vs_currencies", "usd".to_string()),
            ("include_24hr_change", "true".to_string()),
            ("include_market_cap", "true".to_string()),
        ]
    }

    /// Query parameters for `/coins/{id}/market_chart`.
    pub fn market_chart_query(days: u32, granularity: Granularity) -> Vec<(&'static str, String)> {
        vec![
            ("vs_currency", "usd".to_string()),
            ("days", days.to_string()),
            ("interval", granularity.as_str().to_string()),
        ]
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
    /// GET /simple/price?ids=bitcoin,solana&vs_currencies=usd&include_24hr_change=true&include_market_cap=true
    async fn simple_price(&self, assets: [Asset; 2]) -> Result<Value, FetchError> {
        let query = Self::simple_price_query(&assets);
        info!("Fetching simple prices: {}", query[0].1);
        self.fetcher.fetch("/simple/price", &query).await
    }

    /// GET /coins/{id}/market_chart?vs_currency=usd&days=N&interval=I
    async fn market_chart(
        &self,
        asset: Asset,
        days: u32,
        granularity: Granularity,
    ) -> Result<Value, FetchError> {
        let path = format!("/coins/{}/market_chart", asset.coin_id());
        info!("Fetching market chart: {} days={} interval={}", path, days, granularity.as_str());
        self.fetcher
            .fetch(&path, &Self::market_chart_query(days, granularity))
            .await
    }
}
