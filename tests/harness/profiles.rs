// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Traffic profiles for load simulation.

/// Traffic pattern configuration.
#[derive(Debug, Clone)]
pub struct LoadProfile {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Number of distinct keys the requests spread over
    pub unique_keys: usize,
    /// Concurrent workers issuing requests
    pub workers: usize,
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self {
            total_requests: 100,
            unique_keys: 1,
            workers: 1,
        }
    }
}

/// Predefined traffic patterns.
impl LoadProfile {
    /// One key hammered from many workers.
    pub fn single_key_flood() -> Self {
        Self {
            total_requests: 2_000,
            unique_keys: 1,
            workers: 8,
        }
    }

    /// Many keys, each well under its allowance.
    pub fn spread_out() -> Self {
        Self {
            total_requests: 1_000,
            unique_keys: 500,
            workers: 4,
        }
    }

    /// Every request from a key never seen before.
    pub fn once_seen_keys() -> Self {
        Self {
            total_requests: 5_000,
            unique_keys: 5_000,
            workers: 4,
        }
    }

    /// Requests each worker sends.
    pub fn per_worker(&self) -> usize {
        self.total_requests.div_ceil(self.workers)
    }
}
