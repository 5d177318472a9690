// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Metrics collection for load simulation results.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Collects admission outcomes during a simulation.
#[derive(Debug, Default)]
pub struct LoadMetrics {
    /// Start time of the run
    start_time: Option<Instant>,
    /// End time of the run
    end_time: Option<Instant>,
    /// Count of requests by outcome
    outcomes: HashMap<Outcome, usize>,
    /// Admitted requests by key
    admitted_per_key: HashMap<String, usize>,
    /// Latency samples (microseconds)
    latencies: Vec<u64>,
}

/// Possible outcomes for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Admitted,
    Rejected,
}

impl LoadMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of a run.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Mark the end of a run.
    pub fn finish(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Record a request outcome.
    pub fn record(&mut self, outcome: Outcome, key: &str, latency: Duration) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        if outcome == Outcome::Admitted {
            *self.admitted_per_key.entry(key.to_string()).or_insert(0) += 1;
        }
        self.latencies.push(latency.as_micros() as u64);
    }

    /// Get total request count.
    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    /// Get count for a specific outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Admitted requests for one key.
    pub fn admitted_for(&self, key: &str) -> usize {
        self.admitted_per_key.get(key).copied().unwrap_or(0)
    }

    /// Largest number of admissions any single key received.
    pub fn max_admitted_per_key(&self) -> usize {
        self.admitted_per_key.values().copied().max().unwrap_or(0)
    }

    /// Get duration of the run.
    pub fn duration(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Get rejection rate (ratio of rejected to total).
    pub fn reject_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        self.count(Outcome::Rejected) as f64 / total as f64
    }

    /// Get median latency in microseconds.
    pub fn median_latency_us(&self) -> u64 {
        if self.latencies.is_empty() {
            return 0;
        }
        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();
        sorted[sorted.len() / 2]
    }

    /// Generate a summary report.
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            total_requests: self.total_requests(),
            admitted: self.count(Outcome::Admitted),
            rejected: self.count(Outcome::Rejected),
            duration_ms: self.duration().as_millis() as u64,
            reject_rate: self.reject_rate(),
            median_latency_us: self.median_latency_us(),
            admitted_keys: self.admitted_per_key.len(),
        }
    }
}

/// Summary report of a simulation run.
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_requests: usize,
    pub admitted: usize,
    pub rejected: usize,
    pub duration_ms: u64,
    pub reject_rate: f64,
    pub median_latency_us: u64,
    pub admitted_keys: usize,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Load Report ===")?;
        writeln!(f, "Duration:          {} ms", self.duration_ms)?;
        writeln!(f, "Total Requests:    {}", self.total_requests)?;
        writeln!(f, "Admitted:          {}", self.admitted)?;
        writeln!(f, "Rejected:          {}", self.rejected)?;
        writeln!(f, "Reject Rate:       {:.1}%", self.reject_rate * 100.0)?;
        writeln!(f, "Median Latency:    {} us", self.median_latency_us)?;
        writeln!(f, "Admitted Keys:     {}", self.admitted_keys)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        let mut metrics = LoadMetrics::new();
        metrics.start();

        metrics.record(Outcome::Admitted, "a", Duration::from_micros(100));
        metrics.record(Outcome::Admitted, "a", Duration::from_micros(150));
        metrics.record(Outcome::Rejected, "a", Duration::from_micros(50));
        metrics.record(Outcome::Admitted, "b", Duration::from_micros(80));

        metrics.finish();

        assert_eq!(metrics.total_requests(), 4);
        assert_eq!(metrics.admitted_for("a"), 2);
        assert_eq!(metrics.max_admitted_per_key(), 2);
        assert!((metrics.reject_rate() - 0.25).abs() < 0.01);
    }
}
