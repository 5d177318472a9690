// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Keyed Rate Limiter
//!
//! Per-key admission control built on self-expiring token buckets:
//!
//! - One bucket per key, created full on first sight of the key
//! - Fixed-increment refill on a per-bucket background task
//! - Buckets remove themselves once they have fully recovered
//! - Pluggable key extraction (closure, peer IP, request header)
//! - Optional HTTP service with Prometheus metrics
//!
//! ```no_run
//! use keyed_rate_limiter::{Limiter, LimiterConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main] async fn main() {
//! let config = LimiterConfig::new(3, 2, Duration::from_millis(100));
//! let limiter = Limiter::<str>::new(config, |key: &str| key.to_string()).unwrap();
//! assert!(limiter.check_limit("user-A").is_ok());
//! # }
//! ```

mod bucket;
pub mod config;
pub mod error;
pub mod handlers;
pub mod key;
pub mod limiter;
pub mod metrics;

pub use config::{Config, KeyStrategy, LimiterConfig};
pub use error::{ConfigError, LimitExceeded};
pub use key::KeyExtractor;
pub use limiter::Limiter;
