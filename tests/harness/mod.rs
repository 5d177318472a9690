// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for load simulation against the keyed rate limiter.
//!
//! This module provides traffic profiles, key generators and an outcome
//! collector shared by the load tests.

pub mod generators;
pub mod metrics;
pub mod profiles;
