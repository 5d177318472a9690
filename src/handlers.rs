// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the rate limiter service.
//!
//! The service can be used two ways:
//!
//! 1. **External check**: a proxy calls `POST /check` with the key it wants
//!    admitted and forwards the request only if `allowed` is true.
//! 2. **Direct proxy**: any other path is rate limited by the configured
//!    [`KeyStrategy`](crate::config::KeyStrategy) and answered in place.

use crate::config::Config;
use crate::error::{LimitExceeded, ServiceError};
use crate::limiter::Limiter;
use crate::metrics::Metrics;
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

const CHECK_LIMITER: &str = "check";
const PROXY_LIMITER: &str = "proxy";

/// Shared application state.
pub struct AppState {
    pub check_limiter: Limiter<CheckRequest>,
    pub proxy_limiter: Limiter<Request<Body>>,
    pub metrics: Metrics,
    pub config: Config,
}

impl AppState {
    /// Build both limiters from `config`. Must run inside a Tokio runtime.
    pub fn new(config: Config) -> Result<Self, ServiceError> {
        config.validate()?;
        let check_limiter =
            Limiter::<CheckRequest>::new(config.check, |req: &CheckRequest| req.key.clone())?;
        let proxy_limiter =
            Limiter::<Request<Body>>::new(config.proxy, config.key_strategy.clone())?;

        Ok(Self {
            check_limiter,
            proxy_limiter,
            metrics: Metrics::new()?,
            config,
        })
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Admission check request (for external validation).
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub key: String,
}

/// Admission check response.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/check", post(check));

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.fallback(proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "keyed-rate-limiter",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Check whether a key may proceed.
///
/// Answers 200 when admitted and 429 when the key is out of tokens.
pub async fn check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> Response {
    if req.key.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "key must not be empty".to_string(),
                code: "INVALID_KEY",
                retry_after_secs: None,
            }),
        )
            .into_response();
    }

    let result = state.check_limiter.check_limit(&req);
    state.metrics.record(CHECK_LIMITER, result.is_ok());

    match result {
        Ok(()) => {
            debug!(key = %req.key, "Request allowed");
            Json(CheckResponse {
                allowed: true,
                key: req.key,
                reason: None,
                retry_after_secs: None,
            })
            .into_response()
        }
        Err(err) => rate_limited(
            err,
            state.check_limiter.config().refill_interval(),
            |err, retry_after| CheckResponse {
                allowed: false,
                reason: Some(err.to_string()),
                key: err.key,
                retry_after_secs: Some(retry_after),
            },
        ),
    }
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    state
        .metrics
        .set_active_buckets(CHECK_LIMITER, state.check_limiter.active_buckets());
    state
        .metrics
        .set_active_buckets(PROXY_LIMITER, state.proxy_limiter.active_buckets());

    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Rate limit a request that sits directly in the request path.
pub async fn proxy_handler(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let result = state.proxy_limiter.check_limit(&request);
    state.metrics.record(PROXY_LIMITER, result.is_ok());

    match result {
        Ok(()) => {
            debug!(path = %request.uri().path(), "Request admitted");
            // Forwarding upstream belongs to the proxy in front of us.
            (StatusCode::OK, "Request admitted").into_response()
        }
        Err(err) => rate_limited(
            err,
            state.proxy_limiter.config().refill_interval(),
            |err, retry_after| ErrorResponse {
                error: err.to_string(),
                code: "RATE_LIMITED",
                retry_after_secs: Some(retry_after),
            },
        ),
    }
}

/// 429 with a `Retry-After` header and a JSON body built by `body`.
fn rate_limited<B, F>(err: LimitExceeded, refill_interval: Duration, body: F) -> Response
where
    B: Serialize,
    F: FnOnce(LimitExceeded, u64) -> B,
{
    let retry_after = retry_after_secs(refill_interval);
    info!(key = %err.key, retry_after, "Request rate limited");
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, retry_after.to_string())],
        Json(body(err, retry_after)),
    )
        .into_response()
}

/// Whole seconds until at least one refill tick, never zero.
fn retry_after_secs(refill_interval: Duration) -> u64 {
    let secs = refill_interval.as_secs();
    let secs = if refill_interval.subsec_nanos() > 0 { secs + 1 } else { secs };
    secs.max(1)
}
