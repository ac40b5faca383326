use crate::application::{HistorySeriesService, PriceSnapshotService};
use crate::config::Config;
use crate::domain::MarketDataSource;
use crate::infrastructure::{CoinGeckoClient, RetryingFetcher};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub snapshot_service: Arc<PriceSnapshotService>,
    pub history_service: Arc<HistorySeriesService>,
    pub upstream_base_url: String,
    /// Prometheus render handle; `None` when no recorder was installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire both services to one shared upstream client built from `config`.
    pub fn from_config(config: &Config, metrics: Option<PrometheusHandle>) -> anyhow::Result<Self> {
        let fetcher = RetryingFetcher::new(
            &config.upstream.base_url,
            &config.upstream.user_agent,
            config.upstream.timeout(),
            config.upstream.retry_policy(),
        )?;
        let source: Arc<dyn MarketDataSource> = Arc::new(CoinGeckoClient::with_fetcher(fetcher));

        Ok(Self::with_source(source, config, metrics))
    }

    pub fn with_source(
        source: Arc<dyn MarketDataSource>,
        config: &Config,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            snapshot_service: Arc::new(PriceSnapshotService::with_ttl(
                source.clone(),
                config.cache.snapshot_ttl(),
            )),
            history_service: Arc::new(HistorySeriesService::with_ttl(
                source,
                config.cache.history_ttl(),
            )),
            upstream_base_url: config.upstream.base_url.clone(),
            metrics,
        }
    }
}
