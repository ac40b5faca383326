//! Current price snapshot for both tracked assets.
//!
//! Cache-first: a snapshot younger than the TTL is served without touching
//! the upstream. On upstream failure the last known snapshot is served, and
//! when nothing was ever cached a hardcoded pair is served and cached so the
//! next requests within the TTL do not hammer a failing upstream.

use crate::application::cache::{CacheStats, Lookup, TtlCache};
use crate::domain::{
    Asset, FetchError, MarketDataSource, PriceSnapshotPair, Provenance, Served, SimplePriceResponse,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Snapshot freshness window (5 minutes)
pub const SNAPSHOT_TTL: Duration = Duration::from_secs(5 * 60);

const SNAPSHOT_KEY: &str = "prices";

pub struct PriceSnapshotService {
    source: Arc<dyn MarketDataSource>,
    cache: TtlCache<&'static str, PriceSnapshotPair>,
}

impl PriceSnapshotService {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self::with_ttl(source, SNAPSHOT_TTL)
    }

    pub fn with_ttl(source: Arc<dyn MarketDataSource>, ttl: Duration) -> Self {
        info!("Initialized PriceSnapshotService with {}s TTL", ttl.as_secs());
        Self {
            source,
            cache: TtlCache::new("snapshot", ttl),
        }
    }

    /// Get the current snapshot. Never fails.
    pub async fn get_snapshot(&self) -> Served<PriceSnapshotPair> {
        if let Lookup::Fresh(pair) = self.cache.lookup(&SNAPSHOT_KEY).await {
            debug!("Snapshot cache hit");
            return record(Served::new(pair, Provenance::Cached));
        }

        let served = match self.fetch_live().await {
            Ok(pair) => {
                self.cache.store(SNAPSHOT_KEY, pair).await;
                Served::new(pair, Provenance::Live)
            }
            Err(e) => {
                error!(kind = ?e.kind(), "Prices API error: {}", e);
                self.degrade().await
            }
        };

        record(served)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    async fn fetch_live(&self) -> Result<PriceSnapshotPair, FetchError> {
        let value = self.source.simple_price(Asset::PAIR).await?;
        let response: SimplePriceResponse = serde_json::from_value(value)?;
        PriceSnapshotPair::try_from(&response)
    }

    async fn degrade(&self) -> Served<PriceSnapshotPair> {
        if let Some(pair) = self.cache.last_known(&SNAPSHOT_KEY).await {
            warn!("Returning cached snapshot due to upstream error");
            return Served::new(pair, Provenance::StaleCache);
        }

        warn!("No cached snapshot available, seeding cache with fallback prices");
        let pair = PriceSnapshotPair::fallback();
        self.cache.store(SNAPSHOT_KEY, pair).await;
        Served::new(pair, Provenance::Fallback)
    }
}

fn record<T>(served: Served<T>) -> Served<T> {
    metrics::counter!(
        "price_responses_total",
        "service" => "snapshot",
        "source" => served.provenance.as_str()
    )
    .increment(1);
    served
}
