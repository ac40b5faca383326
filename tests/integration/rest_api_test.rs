//! Integration tests for REST API endpoints
//!
//! These tests run the full router against an in-process fake of the price
//! API, so no network access or running server is needed.
//! Run with: `cargo test --test rest_api_test`

mod common;

use common::{get, header, spawn_gateway, Behavior, FakeUpstream, CHART_START_MS};
use cryptohub_price_gateway::domain::{HistoryPoint, PriceSnapshotPair};
use serde_json::Value;

async fn healthy_gateway() -> (FakeUpstream, String) {
    let upstream = FakeUpstream::new(Behavior::Healthy);
    let addr = upstream.spawn().await;
    let base_url = spawn_gateway(addr, |_| {}).await;
    (upstream, base_url)
}

#[tokio::test]
async fn test_snapshot_endpoint_live() {
    let (upstream, base_url) = healthy_gateway().await;

    let response = get(&base_url, "/snapshot").await;
    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "x-data-source"), Some("live"));
    assert_eq!(
        header(&response, "cache-control"),
        Some("public, s-maxage=30, stale-while-revalidate=60")
    );
    assert!(header(&response, "x-fallback").is_none());

    let pair: PriceSnapshotPair = response.json().await.unwrap();
    assert_eq!(pair.bitcoin.usd, 97000.5);
    assert_eq!(pair.bitcoin.usd_24h_change, -1.25);
    assert_eq!(pair.solana.usd, 201.75);
    assert_eq!(pair.solana.usd_market_cap, 9.8e10);

    let query = upstream.last_price_query().unwrap();
    assert_eq!(query["ids"], "bitcoin,solana");
    assert_eq!(query["vs_currencies"], "usd");
    assert_eq!(query["include_24hr_change"], "true");
    assert_eq!(query["include_market_cap"], "true");
}

#[tokio::test]
async fn test_snapshot_is_cached_between_requests() {
    let (upstream, base_url) = healthy_gateway().await;

    let first: Value = get(&base_url, "/snapshot").await.json().await.unwrap();
    let response = get(&base_url, "/snapshot").await;
    assert_eq!(header(&response, "x-data-source"), Some("cache"));
    assert!(header(&response, "cache-control").is_none());

    let second: Value = response.json().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(upstream.price_call_count(), 1);
}

#[tokio::test]
async fn test_history_default_timeframe() {
    let (upstream, base_url) = healthy_gateway().await;

    let response = get(&base_url, "/history").await;
    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "x-data-source"), Some("live"));

    let body: Value = response.json().await.unwrap();
    let points = body.as_array().unwrap();
    assert_eq!(points.len(), 24);
    assert!(points[0]["time"].is_string());
    assert!(points[0]["BTC"].is_number());
    assert!(points[0]["SOL"].is_number());

    let series: Vec<HistoryPoint> = serde_json::from_value(body).unwrap();
    // 1441 minute samples: stride 60, starting one sample in.
    assert_eq!(series[0].time, CHART_START_MS + 60_000);
    assert_eq!(series[0].btc, 60_001.0);
    assert_eq!(series[0].sol, 150.5);
    assert_eq!(series[23].btc, 61_381.0);
    assert!(series.windows(2).all(|w| w[0].time < w[1].time));

    let calls = upstream.chart_calls();
    assert_eq!(calls.len(), 2);
    for (_, query) in &calls {
        assert_eq!(query["vs_currency"], "usd");
        assert_eq!(query["days"], "1");
        assert_eq!(query["interval"], "minute");
    }
}

#[tokio::test]
async fn test_history_weekly_and_monthly() {
    let (upstream, base_url) = healthy_gateway().await;

    let week: Vec<HistoryPoint> = get(&base_url, "/history?timeframe=7d")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(week.len(), 8);
    assert_eq!(week[0].time, CHART_START_MS);

    let month: Vec<HistoryPoint> = get(&base_url, "/history?timeframe=30d")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(month.len(), 31);

    let calls = upstream.chart_calls();
    assert!(calls
        .iter()
        .any(|(id, q)| id == "bitcoin" && q["days"] == "7" && q["interval"] == "daily"));
    assert!(calls
        .iter()
        .any(|(id, q)| id == "solana" && q["days"] == "30" && q["interval"] == "daily"));
}

#[tokio::test]
async fn test_unknown_timeframe_means_24h() {
    let (upstream, base_url) = healthy_gateway().await;

    let series: Vec<HistoryPoint> = get(&base_url, "/history?timeframe=1y")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(series.len(), 24);

    // Same cache slot as an explicit 24h request.
    let response = get(&base_url, "/history?timeframe=24h").await;
    assert_eq!(header(&response, "x-data-source"), Some("cache"));
    assert_eq!(upstream.chart_calls().len(), 2);
}

#[tokio::test]
async fn test_dashboard_aliases() {
    let (_upstream, base_url) = healthy_gateway().await;

    let prices = get(&base_url, "/api/crypto/prices").await;
    assert_eq!(prices.status(), 200);
    let pair: PriceSnapshotPair = prices.json().await.unwrap();
    assert_eq!(pair.bitcoin.usd, 97000.5);

    let history = get(&base_url, "/api/crypto/history?timeframe=7d").await;
    assert_eq!(history.status(), 200);
    let series: Vec<HistoryPoint> = history.json().await.unwrap();
    assert_eq!(series.len(), 8);
}

#[tokio::test]
async fn test_health_endpoint() {
    let upstream = FakeUpstream::new(Behavior::Healthy);
    let upstream_addr = upstream.spawn().await;
    let base_url = spawn_gateway(upstream_addr, |_| {}).await;

    let response = get(&base_url, "/health").await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body.get("version").is_some());
    assert_eq!(body["upstream"], format!("http://{}", upstream_addr));
    assert!(body.get("backend").is_none());
    assert_eq!(body["caches"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_cache_stats_endpoint() {
    let (_upstream, base_url) = healthy_gateway().await;
    get(&base_url, "/snapshot").await;
    get(&base_url, "/snapshot").await;

    let body: Value = get(&base_url, "/cache/stats").await.json().await.unwrap();
    assert_eq!(body["snapshot"]["name"], "snapshot");
    assert_eq!(body["snapshot"]["entries"], 1);
    assert_eq!(body["snapshot"]["hits"], 1);
    assert_eq!(body["snapshot"]["ttl_secs"], 300);
    assert_eq!(body["history"]["entries"], 0);
    assert_eq!(body["history"]["ttl_secs"], 600);
}

#[tokio::test]
async fn test_openapi_document() {
    let (_upstream, base_url) = healthy_gateway().await;

    let response = get(&base_url, "/api-docs/openapi.json").await;
    assert_eq!(response.status(), 200);

    let doc: Value = response.json().await.unwrap();
    assert!(doc["paths"].get("/snapshot").is_some());
    assert!(doc["paths"].get("/history").is_some());
}
