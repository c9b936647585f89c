// ABOUTME: Client IP resolution for anonymous rate limiting
// ABOUTME: Prefers the Cloudflare header, falls back to the socket address
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AMS Works

use axum::http::HeaderMap;
use std::net::SocketAddr;

use crate::constants::headers;

/// Resolve the client IP for rate-limit counting
///
/// `Cf-Connecting-Ip` wins when the service sits behind Cloudflare; the
/// peer socket address is the fallback, and `unknown` buckets requests
/// where neither is available.
#[must_use]
pub fn client_ip(request_headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    request_headers
        .get(headers::CF_CONNECTING_IP)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_owned())
}
