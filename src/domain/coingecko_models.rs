//! Wire models for CoinGecko API responses.
//!
//! Every field is optional on the wire; conversion into the domain entities
//! decides what a missing value means.

use super::{Asset, FetchError, PriceSnapshot, PriceSnapshotPair};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Per-coin entry of `/simple/price`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimplePriceQuote {
    #[serde(default)]
    pub usd: Option<f64>,
    #[serde(default)]
    pub usd_24h_change: Option<f64>,
    #[serde(default)]
    pub usd_market_cap: Option<f64>,
}

impl From<&SimplePriceQuote> for PriceSnapshot {
    fn from(quote: &SimplePriceQuote) -> Self {
        Self {
            usd: quote.usd.unwrap_or(0.0),
            usd_24h_change: quote.usd_24h_change.unwrap_or(0.0),
            usd_market_cap: quote.usd_market_cap.unwrap_or(0.0),
        }
    }
}

/// `/simple/price` response, keyed by coin id
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SimplePriceResponse(pub HashMap<String, SimplePriceQuote>);

impl SimplePriceResponse {
    fn quote(&self, asset: Asset) -> Result<&SimplePriceQuote, FetchError> {
        self.0.get(asset.coin_id()).ok_or_else(|| {
            FetchError::Validation(format!("simple price response has no '{}' entry", asset))
        })
    }
}

impl TryFrom<&SimplePriceResponse> for PriceSnapshotPair {
    type Error = FetchError;

    fn try_from(response: &SimplePriceResponse) -> Result<Self, Self::Error> {
        Ok(Self {
            bitcoin: response.quote(Asset::Bitcoin)?.into(),
            solana: response.quote(Asset::Solana)?.into(),
        })
    }
}

/// Raw `[timestamp_ms, price_usd]` sample from `/coins/{id}/market_chart`
///
/// Decoding never fails: a member that is absent or not a number becomes
/// `None`, and elements past the second are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct RawPricePoint(pub Option<f64>, pub Option<f64>);

impl From<Value> for RawPricePoint {
    fn from(value: Value) -> Self {
        let member = |i: usize| value.get(i).and_then(Value::as_f64);
        Self(member(0), member(1))
    }
}

impl RawPricePoint {
    /// Timestamp in epoch milliseconds, if present, positive and
    /// representable.
    pub fn timestamp_ms(&self) -> Option<i64> {
        self.0
            .filter(|ts| ts.is_finite() && *ts > 0.0 && *ts < i64::MAX as f64)
            .map(|ts| ts as i64)
    }

    pub fn price(&self) -> Option<f64> {
        self.1
    }
}

/// `/coins/{id}/market_chart` response. Only the price series is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketChart {
    #[serde(default)]
    pub prices: Vec<Option<RawPricePoint>>,
}
