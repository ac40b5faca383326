//! Domain layer - Core price entities and the upstream data source trait.
//!
//! This module defines the domain model for the price gateway, following
//! the same clean architecture split as the rest of the crate. It contains:
//! - The `MarketDataSource` trait that application services fetch through
//! - Price snapshot and history point entities served to the dashboard
//! - Timeframe and asset value objects
//! - Response provenance used for headers, metrics and tests

pub mod coingecko_models;
pub mod error;

pub use coingecko_models::*;
pub use error::{ErrorKind, FetchError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

// ============================================================================
// Assets & Timeframes
// ============================================================================

/// One of the two assets tracked by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asset {
    Bitcoin,
    Solana,
}

impl Asset {
    /// Both tracked assets, in chart order (series A, series B).
    pub const PAIR: [Asset; 2] = [Asset::Bitcoin, Asset::Solana];

    /// Identifier used by the upstream price API.
    pub fn coin_id(&self) -> &'static str {
        match self {
            Asset::Bitcoin => "bitcoin",
            Asset::Solana => "solana",
        }
    }

    /// Ticker symbol used as the chart series name.
    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::Bitcoin => "BTC",
            Asset::Solana => "SOL",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.coin_id())
    }
}

/// Upstream sampling granularity for market chart requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Minute,
    Daily,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Minute => "minute",
            Granularity::Daily => "daily",
        }
    }
}

/// Lookback window selector for history requests.
///
/// Each variant fixes the lookback in days, the number of chart points the
/// alignment aims for, and the upstream sampling granularity.
///
/// # Examples
///
/// ```
/// use cryptohub_price_gateway::domain::Timeframe;
///
/// assert_eq!(Timeframe::parse_or_default(Some("7d")), Timeframe::Week);
/// assert_eq!(Timeframe::parse_or_default(Some("1y")), Timeframe::Day);
/// assert_eq!(Timeframe::parse_or_default(None), Timeframe::Day);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
pub enum Timeframe {
    #[default]
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::Day, Timeframe::Week, Timeframe::Month];

    /// Resolve a query label, falling back to `24h` when absent or unknown.
    pub fn parse_or_default(label: Option<&str>) -> Self {
        label.and_then(|l| l.parse().ok()).unwrap_or_default()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Day => "24h",
            Timeframe::Week => "7d",
            Timeframe::Month => "30d",
        }
    }

    pub fn lookback_days(&self) -> u32 {
        match self {
            Timeframe::Day => 1,
            Timeframe::Week => 7,
            Timeframe::Month => 30,
        }
    }

    pub fn target_points(&self) -> usize {
        match self {
            Timeframe::Day => 24,
            Timeframe::Week => 7,
            Timeframe::Month => 30,
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            Timeframe::Day => Granularity::Minute,
            Timeframe::Week | Timeframe::Month => Granularity::Daily,
        }
    }

    /// Whether downsampling anchors on the most recent window instead of
    /// the first raw point.
    pub fn anchors_recent(&self) -> bool {
        matches!(self, Timeframe::Day)
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "24h" => Ok(Timeframe::Day),
            "7d" => Ok(Timeframe::Week),
            "30d" => Ok(Timeframe::Month),
            other => Err(format!("unsupported timeframe: {}", other)),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Price Snapshot
// ============================================================================

/// Current price statistics for one asset.
///
/// Every field is always present; values the upstream omitted are `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct PriceSnapshot {
    /// Spot price in USD (0 = unknown)
    pub usd: f64,
    /// Signed 24h change in percent
    pub usd_24h_change: f64,
    /// Market capitalisation in USD
    pub usd_market_cap: f64,
}

/// Snapshot for both tracked assets, served by `GET /snapshot`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceSnapshotPair {
    pub bitcoin: PriceSnapshot,
    pub solana: PriceSnapshot,
}

impl PriceSnapshotPair {
    /// Hardcoded pair served when the upstream is unreachable and nothing
    /// has been cached yet.
    pub fn fallback() -> Self {
        Self {
            bitcoin: PriceSnapshot {
                usd: 104_397.0,
                usd_24h_change: 2.32,
                usd_market_cap: 2_082_000_000_000.0,
            },
            solana: PriceSnapshot {
                usd: 165.16,
                usd_24h_change: 4.71,
                usd_market_cap: 91_600_000_000.0,
            },
        }
    }

    pub fn get(&self, asset: Asset) -> &PriceSnapshot {
        match asset {
            Asset::Bitcoin => &self.bitcoin,
            Asset::Solana => &self.solana,
        }
    }
}

// ============================================================================
// Price History
// ============================================================================

/// One aligned chart point carrying both asset prices.
///
/// `time` is epoch milliseconds and travels as a JSON string, the shape the
/// dashboard chart expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoryPoint {
    #[serde(with = "millis_string")]
    #[schema(value_type = String, example = "1735678800000")]
    pub time: i64,
    #[serde(rename = "BTC")]
    pub btc: f64,
    #[serde(rename = "SOL")]
    pub sol: f64,
}

/// Serializes epoch milliseconds as a decimal string and accepts either a
/// string or a number when deserializing.
mod millis_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(millis: &i64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&millis.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(i64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Text(s) => s
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("Invalid timestamp: {}", s))),
        }
    }
}

// ============================================================================
// Provenance
// ============================================================================

/// Where a served payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// Fetched from the upstream during this request
    Live,
    /// Served from a cache entry younger than the TTL
    Cached,
    /// Upstream failed; served an expired cache entry
    StaleCache,
    /// Upstream failed with nothing cached; hardcoded or synthetic data
    Fallback,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Live => "live",
            Provenance::Cached => "cache",
            Provenance::StaleCache => "stale",
            Provenance::Fallback => "fallback",
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Provenance::StaleCache | Provenance::Fallback)
    }
}

/// A payload that is always usable, tagged with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Served<T> {
    pub payload: T,
    pub provenance: Provenance,
}

impl<T> Served<T> {
    pub fn new(payload: T, provenance: Provenance) -> Self {
        Self {
            payload,
            provenance,
        }
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

// ============================================================================
// Data Source
// ============================================================================

/// Upstream market data provider.
///
/// Implementations return the raw decoded JSON body; shaping it into domain
/// entities is left to the application services. Must be thread-safe
/// (`Send + Sync`) so one instance can be shared across requests.
///
/// # Implementations
///
/// See `infrastructure::coingecko_client::CoinGeckoClient`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Current USD price, 24h change and market cap for several assets in
    /// one batched request.
    async fn simple_price(&self, assets: [Asset; 2]) -> Result<Value, FetchError>;

    /// Raw `[timestamp_ms, price_usd]` series for one asset.
    async fn market_chart(
        &self,
        asset: Asset,
        days: u32,
        granularity: Granularity,
    ) -> Result<Value, FetchError>;
}
