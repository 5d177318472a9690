// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for load simulation.

use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Generate a pool of user ids.
pub fn generate_users(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("user-{:05}", i)).collect()
}

/// Generate API tokens that differ only in their last characters.
pub fn generate_tokens(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("tok_live_0000000000000000{:08x}", i))
        .collect()
}

/// Keys that look alike but must land in separate buckets.
pub fn generate_confusable_keys() -> Vec<&'static str> {
    vec![
        "user-A",
        "user-a",
        "user-A ",
        " user-A",
        "user-\u{0410}", // Cyrillic A
        "",
    ]
}
