// ABOUTME: Request and response types for the access management routes
// ABOUTME: DTOs for signup, login, refresh, API tokens, and thresholds
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AMS Works

//! Request and response types for the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::api_tokens::ThresholdReport;
use crate::models::{ApiToken, ApiTokenStatus};

/// Signup request
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Skips the verification email; used by trusted internal tooling
    #[serde(default)]
    pub disable_verification: bool,
}

/// Signup response
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user_id: String,
    pub nano_id: String,
    pub message: String,
}

/// Magic-link initiation request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

/// Token query parameter for magic-link completion and verification
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    /// The ephemeral token carried by the emailed link
    pub t: String,
}

/// Expiry report returned alongside session cookies
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionExpiryResponse {
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Refresh request; tokens may also arrive via cookies
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

/// OAuth login start query
#[derive(Debug, Default, Deserialize)]
pub struct OAuthLoginQuery {
    /// Optional post-login redirect URL
    #[serde(default)]
    pub redirect: Option<String>,
}

/// API token creation request
#[derive(Debug, Deserialize)]
pub struct CreateApiTokenRequest {
    /// Lifetime in seconds; `0` requests a permanent token
    pub ttl_seconds: u64,
}

/// One API token on the wire; the secret appears only on creation
#[derive(Debug, Serialize)]
pub struct ApiTokenResponse {
    pub id: String,
    pub owner_nano_id: String,
    pub status: ApiTokenStatus,
    pub ttl_seconds: u64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl ApiTokenResponse {
    /// Wire form of a stored token, without the secret
    #[must_use]
    pub fn from_token(token: &ApiToken) -> Self {
        Self {
            id: token.id.to_string(),
            owner_nano_id: token.owner_nano_id.clone(),
            status: token.status,
            ttl_seconds: token.ttl_seconds,
            last_used_at: token.last_used_at,
            created_at: token.created_at,
            secret: None,
        }
    }

    /// Wire form of a freshly created token, secret shown exactly once
    #[must_use]
    pub fn from_created(token: &ApiToken, secret: String) -> Self {
        let mut response = Self::from_token(token);
        response.secret = Some(secret);
        response
    }
}

/// Quota report for a user's role
#[derive(Debug, Serialize, Deserialize)]
pub struct ThresholdsResponse {
    pub role: String,
    pub permanent_limit: usize,
    pub permanent_in_use: usize,
    pub ephemeral_limit: usize,
    pub ephemeral_in_use: usize,
    pub ephemeral_min_ttl_secs: u64,
    pub ephemeral_max_ttl_secs: u64,
    pub ephemeral_ttl_increment_secs: u64,
}

impl From<ThresholdReport> for ThresholdsResponse {
    fn from(report: ThresholdReport) -> Self {
        Self {
            role: report.threshold.role.to_string(),
            permanent_limit: report.threshold.permanent_limit,
            permanent_in_use: report.permanent_count,
            ephemeral_limit: report.threshold.ephemeral_limit,
            ephemeral_in_use: report.ephemeral_count,
            ephemeral_min_ttl_secs: report.threshold.ephemeral_min_ttl_secs,
            ephemeral_max_ttl_secs: report.threshold.ephemeral_max_ttl_secs,
            ephemeral_ttl_increment_secs: report.threshold.ephemeral_ttl_increment_secs,
        }
    }
}

/// Plain message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Health report
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store_backend: &'static str,
    pub store_healthy: bool,
}
