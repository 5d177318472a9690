// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the keyed rate limiter.
//!
//! Limiter settings are immutable once a [`crate::Limiter`] is built. The
//! service settings are read from environment variables by
//! [`Config::from_env`].

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the rate limiter service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Limiter behind the `/check` endpoint
    #[serde(default)]
    pub check: LimiterConfig,

    /// Limiter applied to proxied requests
    #[serde(default)]
    pub proxy: LimiterConfig,

    /// How proxied requests are mapped to a key
    #[serde(default)]
    pub key_strategy: KeyStrategy,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Token bucket settings shared by every bucket of one limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Bucket capacity and refill ceiling (default: 60)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Tokens added on every refill tick (default: 1)
    #[serde(default = "default_refill_amount")]
    pub refill_amount: u32,

    /// Time between refill ticks, in microseconds on the wire (default: 1s)
    #[serde(
        rename = "refill_interval_us",
        default = "default_refill_interval",
        with = "duration_micros"
    )]
    pub refill_interval: Duration,
}

/// Key derivation used for proxied requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyStrategy {
    /// Remote peer IP address
    #[default]
    PeerIp,
    /// Value of a request header, falling back to the peer IP
    Header { name: String },
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_tokens() -> u32 {
    60
}

fn default_refill_amount() -> u32 {
    1
}

fn default_refill_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            check: LimiterConfig::default(),
            proxy: LimiterConfig::default(),
            key_strategy: KeyStrategy::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            refill_amount: default_refill_amount(),
            refill_interval: default_refill_interval(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl LimiterConfig {
    pub fn new(max_tokens: u32, refill_amount: u32, refill_interval: Duration) -> Self {
        Self {
            max_tokens,
            refill_amount,
            refill_interval,
        }
    }

    /// Get the refill interval
    pub fn refill_interval(&self) -> Duration {
        self.refill_interval
    }

    /// Reject non-positive settings.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(ConfigError::ZeroMaxTokens);
        }
        if self.refill_amount == 0 {
            return Err(ConfigError::ZeroRefillAmount);
        }
        if self.refill_interval.is_zero() {
            return Err(ConfigError::ZeroRefillInterval);
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// - `BIND_ADDR`: server bind address
    /// - `MAX_TOKENS`, `REFILL_AMOUNT`, `REFILL_INTERVAL_MS`: bucket settings
    ///   for both limiters
    /// - `KEY_HEADER`: derive proxy keys from this header instead of the peer IP
    /// - `METRICS_ENABLED`: `true` or `false`
    /// - `METRICS_PATH`: metrics endpoint path
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr;
        }

        let mut limiter = LimiterConfig::default();
        if let Some(v) = parse_var(&lookup, "MAX_TOKENS")? {
            limiter.max_tokens = v;
        }
        if let Some(v) = parse_var(&lookup, "REFILL_AMOUNT")? {
            limiter.refill_amount = v;
        }
        if let Some(v) = parse_var(&lookup, "REFILL_INTERVAL_MS")? {
            limiter.refill_interval = Duration::from_millis(v);
        }
        limiter.validate()?;
        config.check = limiter;
        config.proxy = limiter;

        if let Some(name) = lookup("KEY_HEADER").filter(|n| !n.trim().is_empty()) {
            config.key_strategy = KeyStrategy::Header {
                name: name.trim().to_ascii_lowercase(),
            };
        }

        if let Some(enabled) = parse_var(&lookup, "METRICS_ENABLED")? {
            config.metrics.enabled = enabled;
        }
        if let Some(path) = lookup("METRICS_PATH") {
            config.metrics.path = path.trim().to_string();
        }

        config.validate()?;

        Ok(config)
    }
}

impl Config {
    /// Check both limiters and the metrics route.
    pub fn validate(&self) -> Result<()> {
        self.check.validate()?;
        self.proxy.validate()?;
        if self.metrics.enabled {
            self.metrics.validate()?;
        }
        Ok(())
    }
}

/// Paths the router already serves.
const RESERVED_PATHS: &[&str] = &["/health", "/healthz", "/check"];

impl MetricsConfig {
    /// The path must be absolute and must not shadow another route.
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') || RESERVED_PATHS.contains(&self.path.as_str()) {
            return Err(ConfigError::InvalidMetricsPath(self.path.clone()));
        }
        Ok(())
    }
}

/// Serialize a `Duration` as whole microseconds.
mod duration_micros {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_micros().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_micros)
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}
