//! HTTP handlers for the dashboard price endpoints.
//!
//! The two data endpoints always answer `200`; degraded responses are
//! flagged through headers instead of error statuses.

use crate::api::state::AppState;
use crate::application::CacheStats;
use crate::domain::{HistoryPoint, PriceSnapshotPair, Provenance, Timeframe};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

#[allow(unused_imports)]
use serde_json::json; // Used in utoipa::path examples

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Cache policy for live snapshot responses
pub const SNAPSHOT_CACHE_CONTROL: &str = "public, s-maxage=30, stale-while-revalidate=60";

/// Set to `true` on hardcoded or synthetic responses
pub const X_FALLBACK: HeaderName = HeaderName::from_static("x-fallback");

/// Provenance of the payload: live, cache, stale or fallback
pub const X_DATA_SOURCE: HeaderName = HeaderName::from_static("x-data-source");

#[derive(Deserialize, IntoParams, ToSchema, Debug)]
pub struct HistoryQuery {
    /// Lookback window: 24h, 7d or 30d. Anything else means 24h.
    #[param(example = "7d")]
    pub timeframe: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Base URL of the upstream price API
    pub upstream: String,
    pub caches: Vec<CacheStats>,
}

#[derive(Serialize, ToSchema)]
pub struct CacheStatsResponse {
    pub snapshot: CacheStats,
    pub history: CacheStats,
}

fn provenance_headers(provenance: Provenance) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(X_DATA_SOURCE, HeaderValue::from_static(provenance.as_str()));
    if provenance == Provenance::Fallback {
        headers.insert(X_FALLBACK, HeaderValue::from_static("true"));
    }
    headers
}

/// Get current prices for Bitcoin and Solana.
///
/// Served from a 5 minute cache when possible. On upstream failure returns
/// the last known prices, or hardcoded prices flagged with `X-Fallback`.
#[utoipa::path(
    get,
    path = "/snapshot",
    tag = "prices",
    responses(
        (status = 200, description = "Current price snapshot", body = PriceSnapshotPair,
            example = json!({
                "bitcoin": {"usd": 104397.0, "usd_24h_change": 2.32, "usd_market_cap": 2082000000000.0},
                "solana": {"usd": 165.16, "usd_24h_change": 4.71, "usd_market_cap": 91600000000.0}
            })
        )
    )
)]
#[instrument(skip(state))]
pub async fn snapshot_handler(State(state): State<AppState>) -> Response {
    metrics::counter!("api_requests_total", "endpoint" => "snapshot").increment(1);

    let served = state.snapshot_service.get_snapshot().await;
    let mut headers = provenance_headers(served.provenance);
    if served.provenance == Provenance::Live {
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(SNAPSHOT_CACHE_CONTROL),
        );
    }

    (headers, Json(served.payload)).into_response()
}

/// Get the aligned BTC/SOL price history for a timeframe.
///
/// Returns a 10 minute cached series when possible. On total upstream
/// failure returns a synthetic 24 hour series flagged with `X-Fallback`.
#[utoipa::path(
    get,
    path = "/history",
    params(HistoryQuery),
    tag = "prices",
    responses(
        (status = 200, description = "Chart series ascending by time", body = Vec<HistoryPoint>,
            example = json!([
                {"time": "1735678800000", "BTC": 94321.55, "SOL": 187.4},
                {"time": "1735682400000", "BTC": 94410.02, "SOL": 188.01}
            ])
        )
    )
)]
#[instrument(skip(state), fields(timeframe = ?query.timeframe))]
pub async fn history_handler(
    Query(query): Query<HistoryQuery>,
    State(state): State<AppState>,
) -> Response {
    let timeframe = Timeframe::parse_or_default(query.timeframe.as_deref());
    metrics::counter!("api_requests_total", "endpoint" => "history", "timeframe" => timeframe.label())
        .increment(1);

    let served = state.history_service.get_history(timeframe).await;
    (provenance_headers(served.provenance), Json(served.payload)).into_response()
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: VERSION.to_string(),
        upstream: state.upstream_base_url.clone(),
        caches: vec![
            state.snapshot_service.cache_stats().await,
            state.history_service.cache_stats().await,
        ],
    })
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "system",
    responses(
        (status = 200, description = "Prometheus metrics", content_type = "text/plain"),
        (status = 503, description = "Metrics recorder not installed")
    )
)]
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed",
        )
            .into_response(),
    }
}

/// Get hit/miss statistics for the snapshot and history caches.
#[utoipa::path(
    get,
    path = "/cache/stats",
    tag = "system",
    responses(
        (status = 200, description = "Cache statistics", body = CacheStatsResponse)
    )
)]
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    Json(CacheStatsResponse {
        snapshot: state.snapshot_service.cache_stats().await,
        history: state.history_service.cache_stats().await,
    })
}
