// ABOUTME: Focused per-request context values injected by middleware
// ABOUTME: Handlers read the authenticated requestor from request extensions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AMS Works

/// Authenticated requestor identity
pub mod auth;

pub use auth::RequestorId;
