// ABOUTME: Core data models for the access management service
// ABOUTME: User accounts, roles, statuses, API tokens, and role thresholds
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AMS Works

/// API token records and per-role thresholds
pub mod api_token;
/// User accounts, roles, and the account status state machine
pub mod user;

pub use api_token::{ApiToken, ApiTokenStatus, RoleThreshold};
pub use user::{Role, User, UserStatus};
