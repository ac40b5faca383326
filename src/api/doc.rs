use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        // Price Handlers
        crate::api::handlers::snapshot_handler,
        crate::api::handlers::history_handler,
        // System Handlers
        crate::api::handlers::health_handler,
        crate::api::handlers::metrics_handler,
        crate::api::handlers::cache_stats_handler
    ),
    components(
        schemas(
            crate::domain::PriceSnapshot,
            crate::domain::PriceSnapshotPair,
            crate::domain::HistoryPoint,
            crate::domain::Timeframe,
            crate::application::CacheStats,
            crate::api::handlers::HealthResponse,
            crate::api::handlers::CacheStatsResponse
        )
    ),
    tags(
        (name = "prices", description = "Bitcoin and Solana price snapshot and chart history"),
        (name = "system", description = "System endpoints for health checks, metrics and cache statistics")
    ),
    info(
        title = "CryptoHub Price Gateway",
        version = "0.1.0",
        description = "Cached, rate-limit tolerant access to CoinGecko prices for the CryptoHub dashboard. Data endpoints always answer 200 and degrade to stale or fallback data when the upstream is unavailable."
    )
)]
pub struct ApiDoc;
