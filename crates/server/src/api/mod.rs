//! REST API layer built on Axum.
//!
//! Serves the count and page endpoints of the search protocol, CSV export,
//! reference data for the search form, and admin reload. Includes middleware
//! for admin authentication, request timeouts, metrics collection, and
//! request ID tracing.

/// API error types mapped to HTTP status codes.
pub mod errors;
/// HTTP request handlers and application state.
pub mod handlers;
/// Prometheus metrics recording and background collection.
pub mod metrics;
/// Response data transfer objects.
pub mod models;

use axum::error_handling::HandleErrorLayer;
use axum::extract::{MatchedPath, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{middleware, Router};
use errors::ApiError;
use handlers::AppState;
use snpwizard_core::config;
use std::time::{Duration, Instant};
use tower::buffer::BufferLayer;
use tower::limit::ConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

async fn admin_auth_middleware(
    State(state): State<AppState>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, ApiError> {
    if let Some(ref expected_key) = state.admin_key {
        use subtle::ConstantTimeEq;
        let authorized = req
            .headers()
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.as_bytes().ct_eq(expected_key.as_bytes()).into())
            .unwrap_or(false);

        if !authorized {
            return Err(ApiError::Unauthorized(
                "Invalid or missing admin key".to_string(),
            ));
        }
    }
    Ok(next.run(req).await)
}

async fn request_id_middleware(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!("request", request_id = %request_id);
    async move {
        let mut response = next.run(req).await;
        if let Ok(value) = axum::http::HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(
                axum::http::HeaderName::from_static("x-request-id"),
                value,
            );
        }
        response
    }
    .instrument(span)
    .await
}

async fn security_headers_middleware(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        axum::http::HeaderName::from_static("x-content-type-options"),
        axum::http::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        axum::http::HeaderName::from_static("referrer-policy"),
        axum::http::HeaderValue::from_static("no-referrer"),
    );
    response
}

async fn metrics_middleware(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = req.method().to_string();
    // Label by route template so unknown paths share one series.
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();
    let response = next.run(req).await;
    metrics::record_request(&method, &path, response.status().as_u16(), start.elapsed());
    response
}

/// Builds the Axum router with all routes and middleware layers.
///
/// Only `/loadMore` and `/export` are gzip-compressed; `/count` responses are
/// tiny and always sent as-is.
///
/// The middleware stack (outermost to innermost):
/// Concurrency limit → Timeout → CORS → Trace → Security headers →
/// Request ID → Metrics → (Compression | Admin auth).
pub fn create_router(state: AppState) -> Router {
    let compressed = Router::new()
        .route("/loadMore", get(handlers::load_more))
        .route("/export", get(handlers::export))
        .layer(CompressionLayer::new());

    let admin = Router::new()
        .route("/admin/reload", post(handlers::reload))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    Router::new()
        .route("/count", get(handlers::count))
        .route("/symbols", get(handlers::symbols))
        .route("/reference", get(handlers::reference))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics_endpoint))
        .merge(compressed)
        .merge(admin)
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|err: tower::BoxError| async move {
                    if err.is::<tower::timeout::error::Elapsed>() {
                        StatusCode::REQUEST_TIMEOUT
                    } else {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                }))
                .layer(BufferLayer::new(1024))
                .layer(ConcurrencyLimitLayer::new(config::MAX_CONCURRENT_REQUESTS))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config::REQUEST_TIMEOUT_SECS,
                ))),
        )
        .with_state(state)
}
