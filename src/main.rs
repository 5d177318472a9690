// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Keyed Rate Limiter Service
//!
//! Admission control for upstream services, one token bucket per key.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `MAX_TOKENS`: Bucket capacity (default: 60)
//! - `REFILL_AMOUNT`: Tokens added per tick (default: 1)
//! - `REFILL_INTERVAL_MS`: Time between ticks (default: 1000)
//! - `KEY_HEADER`: Key proxied requests by this header instead of peer IP
//! - `METRICS_ENABLED`: Expose `/metrics` (default: true)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use keyed_rate_limiter::{
    config::Config,
    handlers::{router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        max_tokens = config.proxy.max_tokens,
        refill_amount = config.proxy.refill_amount,
        refill_interval = ?config.proxy.refill_interval(),
        key_strategy = ?config.key_strategy,
        "Starting keyed rate limiter"
    );

    let addr: SocketAddr = config.bind_addr.parse()?;
    let state = Arc::new(AppState::new(config)?);
    let app = router(Arc::clone(&state));

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    state.check_limiter.shutdown();
    state.proxy_limiter.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
