use crate::api::doc::ApiDoc;
use crate::api::handlers::{
    cache_stats_handler, health_handler, history_handler, metrics_handler, snapshot_handler,
};
use crate::api::state::AppState;
use axum::{routing::get, Router};

use axum::http::HeaderValue;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Build the CORS layer from a comma-separated origin list (`*` = any).
fn cors_layer(allowed_origins: &str) -> CorsLayer {
    if allowed_origins.trim() == "*" {
        return CorsLayer::permissive();
    }

    // Parse comma-separated origins, filter out invalid ones
    let origin_values: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    match origin_values.len() {
        0 => {
            tracing::warn!("No valid CORS origins found, falling back to permissive CORS");
            CorsLayer::permissive()
        }
        1 => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin_values[0].clone()))
            .allow_methods(Any)
            .allow_headers(Any),
        _ => CorsLayer::new()
            .allow_origin(AllowOrigin::list(origin_values))
            .allow_methods(Any)
            .allow_headers(Any),
    }
}

pub fn create_router(state: AppState, allowed_origins: String) -> Router {
    // Create middleware stack with security headers and observability
    let middleware = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::span!(
                        Level::INFO,
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, _span: &tracing::Span| {
                        let status = response.status().as_u16();
                        metrics::counter!(
                            "http_requests_total",
                            "status" => status.to_string(),
                            "status_class" => format!("{}xx", status / 100)
                        )
                        .increment(1);
                        metrics::histogram!("http_request_duration_seconds", "status" => status.to_string())
                            .record(latency.as_secs_f64());

                        if latency.as_millis() > 1000 {
                            tracing::warn!("Slow HTTP request: {}ms", latency.as_millis());
                        }
                    },
                ),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(60),
        ))
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(cors_layer(&allowed_origins));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // System endpoints
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/cache/stats", get(cache_stats_handler))
        // Dashboard data endpoints
        .route("/snapshot", get(snapshot_handler))
        .route("/history", get(history_handler))
        // Paths the dashboard frontend already calls
        .route("/api/crypto/prices", get(snapshot_handler))
        .route("/api/crypto/history", get(history_handler))
        .layer(middleware)
        .with_state(state)
}
