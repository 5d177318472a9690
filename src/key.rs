// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Key extraction.
//!
//! A [`KeyExtractor`] maps a request to the key its bucket is stored under.
//! Extractors must be deterministic and must not touch limiter state. Any
//! `Fn(&R) -> String` closure is an extractor; [`KeyStrategy`] covers the
//! HTTP cases the service needs.

use crate::config::KeyStrategy;
use axum::extract::ConnectInfo;
use axum::http::Request;
use std::net::SocketAddr;

/// Key used when a request carries no peer address.
pub const UNKNOWN_PEER: &str = "unknown";

/// Derives a rate limit key from a request.
pub trait KeyExtractor<R: ?Sized>: Send + Sync {
    fn extract(&self, request: &R) -> String;
}

impl<R, F> KeyExtractor<R> for F
where
    R: ?Sized,
    F: Fn(&R) -> String + Send + Sync,
{
    fn extract(&self, request: &R) -> String {
        self(request)
    }
}

/// Remote peer IP, taken from the `ConnectInfo` extension.
pub fn peer_ip<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_PEER.to_string())
}

/// Value of header `name`, or the peer IP when the header is missing,
/// empty or not valid text.
pub fn header_or_peer_ip<B>(request: &Request<B>, name: &str) -> String {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| format!("{}:{}", name, v))
        .unwrap_or_else(|| peer_ip(request))
}

impl<B> KeyExtractor<Request<B>> for KeyStrategy {
    fn extract(&self, request: &Request<B>) -> String {
        match self {
            KeyStrategy::PeerIp => peer_ip(request),
            KeyStrategy::Header { name } => header_or_peer_ip(request, name),
        }
    }
}
