//! Degraded-upstream behaviour: retry on rate limiting, stale and fallback
//! responses.
//!
//! Run with: `cargo test --test resilience_test`

mod common;

use common::{get, header, spawn_gateway, Behavior, FakeUpstream};
use cryptohub_price_gateway::domain::{HistoryPoint, PriceSnapshotPair};
use std::time::Duration;

#[tokio::test]
async fn test_rate_limited_snapshot_retries_with_backoff() {
    let upstream = FakeUpstream::new(Behavior::AlwaysRateLimited);
    let base_url = spawn_gateway(upstream.spawn().await, |_| {}).await;

    let response = get(&base_url, "/snapshot").await;
    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "x-fallback"), Some("true"));

    let calls = upstream.price_call_times();
    assert_eq!(calls.len(), 3);
    assert!(calls[1] - calls[0] >= Duration::from_millis(2000));
    assert!(calls[2] - calls[1] >= Duration::from_millis(4000));

    let pair: PriceSnapshotPair = response.json().await.unwrap();
    assert_eq!(pair, PriceSnapshotPair::fallback());
}

#[tokio::test]
async fn test_rate_limit_then_success() {
    let upstream = FakeUpstream::new(Behavior::RateLimitedOnce);
    let base_url = spawn_gateway(upstream.spawn().await, |config| {
        config.upstream.initial_retry_delay_ms = 50;
    })
    .await;

    let response = get(&base_url, "/snapshot").await;
    assert_eq!(header(&response, "x-data-source"), Some("live"));
    assert!(header(&response, "cache-control").is_some());

    let calls = upstream.price_call_times();
    assert_eq!(calls.len(), 2);
    assert!(calls[1] - calls[0] >= Duration::from_millis(50));

    let pair: PriceSnapshotPair = response.json().await.unwrap();
    assert_eq!(pair.bitcoin.usd, 97000.5);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let upstream = FakeUpstream::new(Behavior::ServerError);
    let base_url = spawn_gateway(upstream.spawn().await, |_| {}).await;

    let response = get(&base_url, "/snapshot").await;
    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "x-data-source"), Some("fallback"));
    assert_eq!(upstream.price_call_count(), 1);
}

#[tokio::test]
async fn test_fallback_seeds_cache() {
    let upstream = FakeUpstream::new(Behavior::ServerError);
    let base_url = spawn_gateway(upstream.spawn().await, |_| {}).await;

    get(&base_url, "/snapshot").await;
    upstream.set_behavior(Behavior::Healthy);

    // Within the TTL the fallback pair is served from cache.
    let response = get(&base_url, "/snapshot").await;
    assert_eq!(header(&response, "x-data-source"), Some("cache"));
    assert!(header(&response, "x-fallback").is_none());
    let pair: PriceSnapshotPair = response.json().await.unwrap();
    assert_eq!(pair, PriceSnapshotPair::fallback());
    assert_eq!(upstream.price_call_count(), 1);
}

#[tokio::test]
async fn test_timeout_serves_fallback_without_retry() {
    let upstream = FakeUpstream::new(Behavior::Slow(Duration::from_secs(3)));
    let base_url = spawn_gateway(upstream.spawn().await, |config| {
        config.upstream.timeout_secs = 1;
    })
    .await;

    let response = get(&base_url, "/snapshot").await;
    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "x-fallback"), Some("true"));
    assert_eq!(upstream.price_call_count(), 1);
}

#[tokio::test]
async fn test_stale_snapshot_after_expiry() {
    let upstream = FakeUpstream::new(Behavior::Healthy);
    let base_url = spawn_gateway(upstream.spawn().await, |config| {
        config.cache.snapshot_ttl_secs = 0;
    })
    .await;

    let live = get(&base_url, "/snapshot").await;
    assert_eq!(header(&live, "x-data-source"), Some("live"));

    upstream.set_behavior(Behavior::ServerError);
    let response = get(&base_url, "/snapshot").await;
    assert_eq!(header(&response, "x-data-source"), Some("stale"));
    assert!(header(&response, "x-fallback").is_none());
    assert!(header(&response, "cache-control").is_none());

    let pair: PriceSnapshotPair = response.json().await.unwrap();
    assert_eq!(pair.bitcoin.usd, 97000.5);
    assert_eq!(upstream.price_call_count(), 2);
}

#[tokio::test]
async fn test_history_synthetic_fallback_is_not_cached() {
    let upstream = FakeUpstream::new(Behavior::ServerError);
    let base_url = spawn_gateway(upstream.spawn().await, |_| {}).await;

    let response = get(&base_url, "/history?timeframe=30d").await;
    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "x-fallback"), Some("true"));

    let series: Vec<HistoryPoint> = response.json().await.unwrap();
    assert_eq!(series.len(), 24);
    assert!(series.windows(2).all(|w| w[1].time - w[0].time == 3_600_000));
    assert!(series.iter().all(|p| p.btc > 0.0 && p.sol > 0.0));

    let after_first = upstream.chart_calls().len();
    assert!(after_first >= 1);

    upstream.set_behavior(Behavior::Healthy);
    let response = get(&base_url, "/history?timeframe=30d").await;
    assert_eq!(header(&response, "x-data-source"), Some("live"));
    let series: Vec<HistoryPoint> = response.json().await.unwrap();
    assert_eq!(series.len(), 31);
    assert!(upstream.chart_calls().len() > after_first);
}

#[tokio::test]
async fn test_stale_history_after_expiry() {
    let upstream = FakeUpstream::new(Behavior::Healthy);
    let base_url = spawn_gateway(upstream.spawn().await, |config| {
        config.cache.history_ttl_secs = 0;
    })
    .await;

    let live: Vec<HistoryPoint> = get(&base_url, "/history?timeframe=7d")
        .await
        .json()
        .await
        .unwrap();

    upstream.set_behavior(Behavior::ServerError);
    let response = get(&base_url, "/history?timeframe=7d").await;
    assert_eq!(header(&response, "x-data-source"), Some("stale"));
    let stale: Vec<HistoryPoint> = response.json().await.unwrap();
    assert_eq!(stale, live);
}
