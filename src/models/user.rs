// ABOUTME: User model with roles and the account status state machine
// ABOUTME: Status transitions are closed; anything off the table is rejected
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AMS Works

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, ErrorCode};

/// User role; lower ranking means more privileged
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    High,
    Mid,
    Default,
}

impl Role {
    /// Privilege ranking; lower is more privileged
    #[must_use]
    pub const fn ranking(self) -> u8 {
        match self {
            Self::Admin => 0,
            Self::High => 1,
            Self::Mid => 2,
            Self::Default => 3,
        }
    }

    /// Convert to string for storage
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::High => "high",
            Self::Mid => "mid",
            Self::Default => "default",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "high" => Ok(Self::High),
            "mid" => Ok(Self::Mid),
            "default" => Ok(Self::Default),
            _ => Err(AppError::new(
                ErrorCode::InvalidUserBody,
                format!("unknown role: {s}"),
            )),
        }
    }
}

/// User account status
///
/// Exactly one status at any time. Only the transitions listed in
/// [`UserStatus::can_transition_to`] are accepted; everything else fails
/// with a state conflict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Account created, email not yet verified
    #[default]
    Provisioned,
    /// Email verified, account in good standing
    Active,
    /// Deactivated by the user; may reactivate
    Deactivated,
    /// Suspended by an operator
    Suspended,
    /// Locked out after abuse detection
    LockedOut,
    /// Recovery flow in progress; no outbound transitions
    Recovery,
}

impl UserStatus {
    /// Whether the `self → next` transition is on the accepted table
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Provisioned, Self::Active)
                | (Self::Active, Self::Suspended)
                | (Self::Suspended, Self::Active)
                | (Self::Active, Self::LockedOut)
                | (Self::LockedOut, Self::Active)
                | (Self::Active, Self::Deactivated)
                | (Self::Deactivated, Self::Active)
                | (Self::Active, Self::Provisioned)
        )
    }

    /// Convert to string for storage
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Provisioned => "provisioned",
            Self::Active => "active",
            Self::Deactivated => "deactivated",
            Self::Suspended => "suspended",
            Self::LockedOut => "locked_out",
            Self::Recovery => "recovery",
        }
    }
}

impl Display for UserStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// A user account as seen by the access manager
///
/// The record itself is owned by the user service; the core reads it,
/// drives its status machine, and hands it back to be saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Globally unique identifier
    pub id: Uuid,
    /// Short unique identifier for external references
    pub nano_id: String,
    /// Email address, unique and lowercased
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Current account status
    pub status: UserStatus,
    /// Role set; quota decisions use the highest-ranked member
    pub roles: Vec<Role>,
    pub email_verified: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    /// Last login that presented a fresh credential (magic link or SSO)
    pub last_fresh_login_at: Option<DateTime<Utc>>,
    /// First time the account reached ACTIVE; gates reactivation
    pub activated_at: Option<DateTime<Utc>>,
    pub status_changed_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new provisioned user
    #[must_use]
    pub fn new(first_name: &str, last_name: &str, email: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            nano_id: generate_nano_id(),
            email: email.trim().to_lowercase(),
            first_name: title_case(first_name),
            last_name: title_case(last_name),
            status: UserStatus::Provisioned,
            roles: vec![Role::Default],
            email_verified: false,
            email_verified_at: None,
            created_at: now,
            updated_at: now,
            last_login_at: None,
            last_fresh_login_at: None,
            activated_at: None,
            status_changed_at: None,
        }
    }

    /// Whether the role set carries admin privilege
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    /// Whether the account is currently active
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, UserStatus::Active)
    }

    /// The most privileged role on the account
    #[must_use]
    pub fn highest_role(&self) -> Role {
        self.roles
            .iter()
            .copied()
            .min_by_key(|r| r.ranking())
            .unwrap_or(Role::Default)
    }

    /// Drive the status machine; off-table transitions fail
    ///
    /// Reactivation additionally requires the account to have been activated
    /// at least once before.
    ///
    /// # Errors
    ///
    /// Returns `ConflictingUserState` when the transition is not on the table.
    pub fn transition_to(&mut self, next: UserStatus) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::new(
                ErrorCode::ConflictingUserState,
                format!("cannot transition user from {} to {}", self.status, next),
            ));
        }
        if self.status == UserStatus::Deactivated
            && next == UserStatus::Active
            && self.activated_at.is_none()
        {
            return Err(AppError::new(
                ErrorCode::ConflictingUserState,
                "cannot reactivate an account that was never activated",
            ));
        }

        let now = Utc::now();
        if next == UserStatus::Active && self.activated_at.is_none() {
            self.activated_at = Some(now);
        }
        // Email change re-provisions the account and unverifies the address.
        if next == UserStatus::Provisioned {
            self.email_verified = false;
            self.email_verified_at = None;
        }
        self.status = next;
        self.status_changed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Record a verified email address
    pub fn mark_email_verified(&mut self) {
        let now = Utc::now();
        self.email_verified = true;
        self.email_verified_at = Some(now);
        self.updated_at = now;
    }

    /// Record a login; `fresh` marks magic-link and SSO logins
    pub fn record_login(&mut self, fresh: bool) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        if fresh {
            self.last_fresh_login_at = Some(now);
        }
        self.updated_at = now;
    }
}

/// Generate a short unique identifier
fn generate_nano_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

/// Uppercase the first letter, lowercase the rest
fn title_case(s: &str) -> String {
    let trimmed = s.trim();
    let mut chars = trimmed.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_normalizes_fields() {
        let user = User::new("ada", "LOVELACE", " Ada@Example.COM ");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.first_name, "Ada");
        assert_eq!(user.last_name, "Lovelace");
        assert_eq!(user.status, UserStatus::Provisioned);
        assert!(!user.email_verified);
    }

    #[test]
    fn test_accepted_transitions() {
        let mut user = User::new("a", "b", "a@b.c");
        user.transition_to(UserStatus::Active).unwrap();
        assert!(user.activated_at.is_some());
        user.transition_to(UserStatus::Suspended).unwrap();
        user.transition_to(UserStatus::Active).unwrap();
        user.transition_to(UserStatus::LockedOut).unwrap();
        user.transition_to(UserStatus::Active).unwrap();
        user.transition_to(UserStatus::Deactivated).unwrap();
        user.transition_to(UserStatus::Active).unwrap();
    }

    #[test]
    fn test_rejected_transitions() {
        let mut user = User::new("a", "b", "a@b.c");
        // Provisioned cannot suspend
        assert!(user.transition_to(UserStatus::Suspended).is_err());
        user.transition_to(UserStatus::Active).unwrap();
        user.transition_to(UserStatus::Suspended).unwrap();
        // Suspended cannot deactivate
        assert!(user.transition_to(UserStatus::Deactivated).is_err());
        // Recovery has no outbound transitions
        let mut recovering = User::new("a", "b", "r@b.c");
        recovering.status = UserStatus::Recovery;
        assert!(recovering.transition_to(UserStatus::Active).is_err());
    }

    #[test]
    fn test_email_change_unverifies() {
        let mut user = User::new("a", "b", "a@b.c");
        user.transition_to(UserStatus::Active).unwrap();
        user.mark_email_verified();
        user.transition_to(UserStatus::Provisioned).unwrap();
        assert!(!user.email_verified);
        assert!(user.email_verified_at.is_none());
    }

    #[test]
    fn test_reactivate_requires_prior_activation() {
        let mut user = User::new("a", "b", "a@b.c");
        user.status = UserStatus::Deactivated;
        assert!(user.transition_to(UserStatus::Active).is_err());
    }

    #[test]
    fn test_highest_role() {
        let mut user = User::new("a", "b", "a@b.c");
        user.roles = vec![Role::Default, Role::Mid];
        assert_eq!(user.highest_role(), Role::Mid);
        user.roles.push(Role::Admin);
        assert_eq!(user.highest_role(), Role::Admin);
        assert!(user.is_admin());
    }
}
