// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for admission decisions.

use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

/// Admission counters, labelled by limiter name.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    admitted: IntCounterVec,
    rejected: IntCounterVec,
    active_buckets: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let admitted = IntCounterVec::new(
            Opts::new("limiter_admitted_total", "Requests admitted"),
            &["limiter"],
        )?;
        let rejected = IntCounterVec::new(
            Opts::new("limiter_rejected_total", "Requests rejected with 429"),
            &["limiter"],
        )?;
        let active_buckets = IntGaugeVec::new(
            Opts::new("limiter_active_buckets", "Keys with a live bucket"),
            &["limiter"],
        )?;

        registry.register(Box::new(admitted.clone()))?;
        registry.register(Box::new(rejected.clone()))?;
        registry.register(Box::new(active_buckets.clone()))?;

        Ok(Self {
            registry,
            admitted,
            rejected,
            active_buckets,
        })
    }

    pub fn record(&self, limiter: &str, admitted: bool) {
        let counter = if admitted { &self.admitted } else { &self.rejected };
        counter.with_label_values(&[limiter]).inc();
    }

    pub fn set_active_buckets(&self, limiter: &str, count: usize) {
        self.active_buckets
            .with_label_values(&[limiter])
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Encode all metrics in the Prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
