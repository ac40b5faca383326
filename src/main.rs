//! CryptoHub Price Gateway
//!
//! Backend for the CryptoHub dashboard: current Bitcoin and Solana prices
//! plus an aligned two-asset chart series, proxied from the public CoinGecko
//! API with in-memory caching, retry on rate limiting and graceful fallbacks.
//!
//! # Architecture
//!
//! - **Domain**: Core entities, upstream wire models and the market data trait
//! - **Application**: TTL caches, snapshot service and history series service
//! - **Infrastructure**: Retrying HTTP fetcher and the CoinGecko client
//! - **API**: HTTP handlers, routing and middleware
//!
//! # Configuration
//!
//! The gateway reads `config.yaml` (or the file named by `CONFIG_PATH`) and
//! environment variables:
//! - `PORT`: Listen port override
//! - `COINGECKO_BASE_URL`: Upstream base URL override
//! - `RUST_LOG`: Logging level (default: info)
//! - `LOG_FORMAT`: `json` or `text` (default: text)
//!
//! # Quick Start
//!
//! ```bash
//! cargo run --release
//!
//! curl http://localhost:3010/snapshot
//! curl "http://localhost:3010/history?timeframe=7d"
//! ```

use anyhow::Context;
use cryptohub_price_gateway::api::routes::create_router;
use cryptohub_price_gateway::api::state::AppState;
use cryptohub_price_gateway::config::Config;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = EnvFilter::new(env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));

    if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load Config
    let config_path = PathBuf::from(env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string()));
    let mut config = if config_path.exists() {
        Config::load(&config_path)?
    } else {
        tracing::warn!(
            "{} not found, using built-in defaults",
            config_path.display()
        );
        Config::default()
    };
    config.apply_env_overrides();

    let metrics_handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!("Failed to install Prometheus recorder: {}, /metrics disabled", e);
            None
        }
    };

    let state = AppState::from_config(&config, metrics_handle)
        .context("Failed to build upstream HTTP client")?;
    tracing::info!(
        "Upstream: {} (timeout {}s, {} attempts)",
        config.upstream.base_url,
        config.upstream.timeout_secs,
        config.upstream.max_attempts
    );

    let app = create_router(state, config.server.allowed_origins.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;
    tracing::info!("CryptoHub price gateway running at http://{}", addr);

    // Graceful shutdown handling
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error during operation")?;

    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C) to initiate graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
