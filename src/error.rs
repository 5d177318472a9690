// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the keyed rate limiter.

use thiserror::Error;

/// Invalid limiter or service configuration.
///
/// A limiter is never constructed from a configuration that fails here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_tokens must be greater than zero")]
    ZeroMaxTokens,

    #[error("refill_amount must be greater than zero")]
    ZeroRefillAmount,

    #[error("refill_interval must be greater than zero")]
    ZeroRefillInterval,

    #[error("no Tokio runtime available to drive refill tasks")]
    NoRuntime,

    #[error("Invalid metrics path {0:?}: must start with '/' and not be /health, /healthz or /check")]
    InvalidMetricsPath(String),

    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// The caller identified by `key` has no tokens left.
///
/// This is an expected outcome, not a fault: callers turn it into a
/// rejection response (HTTP 429 in the bundled service).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Rate limit exceeded for key {key}")]
pub struct LimitExceeded {
    pub key: String,
}

impl LimitExceeded {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Failure while assembling the HTTP service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
