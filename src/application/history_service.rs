//! Aligned BTC/SOL price history for chart rendering.
//!
//! Both raw market chart series are fetched concurrently with identical
//! lookback and granularity, then downsampled by fixed stride into a single
//! series of `HistoryPoint`s. Results are cached per timeframe.
//!
//! The two raw series are joined by index, not by timestamp: the upstream
//! samples both coins on the same schedule for identical parameters, and
//! the timestamp of the bitcoin sample is used for the joined point.

use crate::application::cache::{CacheStats, Lookup, TtlCache};
use crate::domain::{
    Asset, FetchError, HistoryPoint, MarketChart, MarketDataSource, Provenance, RawPricePoint,
    Served, Timeframe,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// History freshness window (10 minutes)
pub const HISTORY_TTL: Duration = Duration::from_secs(10 * 60);

/// Number of points in the synthetic fallback series
pub const SYNTHETIC_POINTS: usize = 24;

const HOUR_MS: i64 = 3_600_000;

pub struct HistorySeriesService {
    source: Arc<dyn MarketDataSource>,
    cache: TtlCache<Timeframe, Vec<HistoryPoint>>,
}

impl HistorySeriesService {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self::with_ttl(source, HISTORY_TTL)
    }

    pub fn with_ttl(source: Arc<dyn MarketDataSource>, ttl: Duration) -> Self {
        info!("Initialized HistorySeriesService with {}s TTL", ttl.as_secs());
        Self {
            source,
            cache: TtlCache::new("history", ttl),
        }
    }

    /// Get the aligned series for `timeframe`. Never fails and never
    /// returns an empty series.
    pub async fn get_history(&self, timeframe: Timeframe) -> Served<Vec<HistoryPoint>> {
        if let Lookup::Fresh(series) = self.cache.lookup(&timeframe).await {
            debug!("History cache hit: {}", timeframe);
            return record(timeframe, Served::new(series, Provenance::Cached));
        }

        let served = match self.fetch_live(timeframe).await {
            Ok(series) => {
                self.cache.store(timeframe, series.clone()).await;
                Served::new(series, Provenance::Live)
            }
            Err(e) => {
                error!(kind = ?e.kind(), timeframe = %timeframe, "History API error: {}", e);
                match self.cache.last_known(&timeframe).await {
                    Some(series) => {
                        warn!("Returning cached {} history due to upstream error", timeframe);
                        Served::new(series, Provenance::StaleCache)
                    }
                    None => {
                        warn!("No cached {} history, serving synthetic series", timeframe);
                        Served::new(
                            synthetic_series(Utc::now().timestamp_millis()),
                            Provenance::Fallback,
                        )
                    }
                }
            }
        };

        record(timeframe, served)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    async fn fetch_live(&self, timeframe: Timeframe) -> Result<Vec<HistoryPoint>, FetchError> {
        let days = timeframe.lookback_days();
        let granularity = timeframe.granularity();

        let (btc, sol) = tokio::try_join!(
            self.source.market_chart(Asset::Bitcoin, days, granularity),
            self.source.market_chart(Asset::Solana, days, granularity),
        )?;

        let btc: MarketChart = serde_json::from_value(btc)?;
        let sol: MarketChart = serde_json::from_value(sol)?;

        let series = align_series(&btc.prices, &sol.prices, timeframe);
        if series.is_empty() {
            return Err(FetchError::Validation(format!(
                "no usable {} price points ({} btc / {} sol raw samples)",
                timeframe,
                btc.prices.len(),
                sol.prices.len()
            )));
        }

        debug!(
            "Aligned {} history: {} raw samples -> {} points",
            timeframe,
            btc.prices.len(),
            series.len()
        );
        Ok(series)
    }
}

/// Downsample two index-aligned raw series into chart points.
///
/// - `step = max(1, len_a / target)`
/// - start at `len_a - target × step` for timeframes anchored on the most
///   recent window, otherwise at 0
/// - walk `i` by `step` while both series have a sample at `i`
/// - drop the index when either sample lacks a timestamp or a price, or
///   either rounded price is not strictly positive
pub fn align_series(
    a: &[Option<RawPricePoint>],
    b: &[Option<RawPricePoint>],
    timeframe: Timeframe,
) -> Vec<HistoryPoint> {
    let target = timeframe.target_points();
    let step = (a.len() / target).max(1);
    let start = if timeframe.anchors_recent() {
        a.len().saturating_sub(target * step)
    } else {
        0
    };
    let end = a.len().min(b.len());

    (start..end)
        .step_by(step)
        .filter_map(|i| join_point(a[i].as_ref()?, b[i].as_ref()?))
        .collect()
}

fn join_point(a: &RawPricePoint, b: &RawPricePoint) -> Option<HistoryPoint> {
    let time = a.timestamp_ms()?;
    b.timestamp_ms()?;

    let btc = round2(a.price()?);
    let sol = round2(b.price()?);
    if btc <= 0.0 || sol <= 0.0 {
        return None;
    }

    Some(HistoryPoint { time, btc, sol })
}

/// Smooth placeholder series covering the 24 hours before `now_ms` at
/// hourly spacing, so the chart always has something to draw.
pub fn synthetic_series(now_ms: i64) -> Vec<HistoryPoint> {
    (0..SYNTHETIC_POINTS)
        .map(|i| {
            let hours_back = (SYNTHETIC_POINTS - 1 - i) as i64;
            let x = i as f64;
            HistoryPoint {
                time: now_ms - hours_back * HOUR_MS,
                btc: (30_000.0 + (x / 3.0).sin() * 500.0).round(),
                sol: round2(20.0 + (x / 4.0).cos() * 2.0),
            }
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn record<T>(timeframe: Timeframe, served: Served<T>) -> Served<T> {
    metrics::counter!(
        "price_responses_total",
        "service" => "history",
        "timeframe" => timeframe.label(),
        "source" => served.provenance.as_str()
    )
    .increment(1);
    served
}
