// ABOUTME: API token records and the per-role threshold table
// ABOUTME: Thresholds bound token counts and validate requested TTLs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AMS Works

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;
use crate::errors::{AppError, ErrorCode};

/// API token lifecycle status
///
/// Revoked tokens remain on the books and still count against quotas;
/// only deletion frees a slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApiTokenStatus {
    Active,
    Revoked,
}

/// A long-lived API token owned by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiToken {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub owner_nano_id: String,
    /// Hash of the secret; the plain secret is only shown once at creation
    #[serde(skip_serializing, default)]
    pub encoded_secret: String,
    pub status: ApiTokenStatus,
    /// Lifetime in seconds; `0` means permanent
    pub ttl_seconds: u64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApiToken {
    /// Whether this token never expires
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        self.ttl_seconds == 0
    }
}

/// Per-role limits on API token issuance
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoleThreshold {
    pub role: Role,
    /// Privilege ranking; mirrors [`Role::ranking`]
    pub ranking: u8,
    /// Maximum simultaneous permanent tokens (non-deleted)
    pub permanent_limit: usize,
    /// Maximum simultaneous ephemeral tokens (non-deleted)
    pub ephemeral_limit: usize,
    /// Minimum allowed TTL for ephemeral tokens, seconds
    pub ephemeral_min_ttl_secs: u64,
    /// Maximum allowed TTL for ephemeral tokens, seconds
    pub ephemeral_max_ttl_secs: u64,
    /// Requested TTLs must land on this increment
    pub ephemeral_ttl_increment_secs: u64,
}

/// Process-wide threshold table, most privileged first
const ROLE_THRESHOLDS: [RoleThreshold; 4] = [
    RoleThreshold {
        role: Role::Admin,
        ranking: 0,
        permanent_limit: 10,
        ephemeral_limit: 10,
        ephemeral_min_ttl_secs: 300,
        ephemeral_max_ttl_secs: 86_400,
        ephemeral_ttl_increment_secs: 60,
    },
    RoleThreshold {
        role: Role::High,
        ranking: 1,
        permanent_limit: 3,
        ephemeral_limit: 5,
        ephemeral_min_ttl_secs: 1_500,
        ephemeral_max_ttl_secs: 21_600,
        ephemeral_ttl_increment_secs: 300,
    },
    RoleThreshold {
        role: Role::Mid,
        ranking: 2,
        permanent_limit: 2,
        ephemeral_limit: 3,
        ephemeral_min_ttl_secs: 1_800,
        ephemeral_max_ttl_secs: 21_600,
        ephemeral_ttl_increment_secs: 600,
    },
    RoleThreshold {
        role: Role::Default,
        ranking: 3,
        permanent_limit: 1,
        ephemeral_limit: 2,
        ephemeral_min_ttl_secs: 3_600,
        ephemeral_max_ttl_secs: 10_800,
        ephemeral_ttl_increment_secs: 900,
    },
];

impl RoleThreshold {
    /// Look up the threshold record for a role
    #[must_use]
    pub fn for_role(role: Role) -> &'static Self {
        // The table covers every Role variant.
        ROLE_THRESHOLDS
            .iter()
            .find(|t| t.role == role)
            .unwrap_or(&ROLE_THRESHOLDS[3])
    }

    /// Validate a requested ephemeral TTL against this role's constraints
    ///
    /// A TTL of `0` requests a permanent token and is not range-checked.
    ///
    /// # Errors
    ///
    /// Returns `TtlTooShort`, `TtlTooLong`, or `TtlOutsideAllowedIncrement`.
    pub fn validate_ttl(&self, ttl_seconds: u64) -> Result<(), AppError> {
        if ttl_seconds == 0 {
            return Ok(());
        }
        if ttl_seconds < self.ephemeral_min_ttl_secs {
            return Err(AppError::new(
                ErrorCode::TtlTooShort,
                format!(
                    "ttl {ttl_seconds}s is below the {} role minimum of {}s",
                    self.role, self.ephemeral_min_ttl_secs
                ),
            ));
        }
        if ttl_seconds > self.ephemeral_max_ttl_secs {
            return Err(AppError::new(
                ErrorCode::TtlTooLong,
                format!(
                    "ttl {ttl_seconds}s is above the {} role maximum of {}s",
                    self.role, self.ephemeral_max_ttl_secs
                ),
            ));
        }
        if ttl_seconds % self.ephemeral_ttl_increment_secs != 0 {
            return Err(AppError::new(
                ErrorCode::TtlOutsideAllowedIncrement,
                format!(
                    "ttl {ttl_seconds}s is not a multiple of {}s",
                    self.ephemeral_ttl_increment_secs
                ),
            ));
        }
        Ok(())
    }
}
