// ABOUTME: HTTP middleware for request authentication policies
// ABOUTME: Policy gates plus client IP resolution for rate limiting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AMS Works

/// Authentication policy gates
pub mod auth;
/// Client IP resolution for the rate-limit path
pub mod rate_limiting;

pub use auth::AuthGateway;
