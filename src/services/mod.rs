// ABOUTME: Contracts for the externally owned collaborators of the core
// ABOUTME: User store, API token store, email delivery, audit log, billing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AMS Works

//! # Collaborator contracts
//!
//! The access manager core does not own persistence, email delivery, or
//! audit durability. It consumes these capabilities through the traits
//! below. Production wiring provides database- and queue-backed
//! implementations; the [`dev`] module carries in-memory backends for
//! development deployments and tests.

/// In-memory development backends
pub mod dev;

use crate::errors::AppResult;
use crate::models::{ApiToken, User};
use uuid::Uuid;

/// Audit trail event kinds the core emits (best-effort, never fatal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEvent {
    UserAccountNew,
    UserAccountNewSso,
    UserLogin,
    UserLoginSso,
    UserLogout,
}

/// User record store
///
/// Owns email uniqueness and field normalization (emails lowercased,
/// names title-cased).
#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// Create a provisioned user
    ///
    /// # Errors
    ///
    /// Returns `InvalidUserEmail` on a duplicate or malformed address.
    async fn create_user(&self, first_name: &str, last_name: &str, email: &str)
        -> AppResult<User>;

    /// Fetch a user by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    async fn user_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Fetch a user by email (lowercased before lookup)
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Persist an updated user record
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    async fn save_user(&self, user: &User) -> AppResult<()>;
}

/// API token store
#[async_trait::async_trait]
pub trait ApiTokenService: Send + Sync {
    /// Create a token for a user, returning the record and the plain secret
    /// (shown exactly once)
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    async fn create_token(&self, user: &User, ttl_seconds: u64) -> AppResult<(ApiToken, String)>;

    /// Page through a user's non-deleted tokens
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    async fn tokens_for_user(
        &self,
        user_id: Uuid,
        page: u32,
        per_page: u32,
    ) -> AppResult<Vec<ApiToken>>;

    /// Mark a token ACTIVE
    ///
    /// # Errors
    ///
    /// Returns an error if the token does not exist or the write fails.
    async fn activate_token(&self, token_id: Uuid) -> AppResult<()>;

    /// Mark a token REVOKED
    ///
    /// # Errors
    ///
    /// Returns an error if the token does not exist or the write fails.
    async fn revoke_token(&self, token_id: Uuid) -> AppResult<()>;

    /// Delete a token, freeing its quota slot
    ///
    /// # Errors
    ///
    /// Returns an error if the token does not exist or the write fails.
    async fn delete_token(&self, token_id: Uuid) -> AppResult<()>;

    /// Resolve a presented secret to its ACTIVE, unexpired token record
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    async fn validate_secret(&self, presented: &str) -> AppResult<Option<ApiToken>>;

    /// Update a token's last-used timestamp (best-effort at call sites)
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn touch_last_used(&self, token_id: Uuid) -> AppResult<()>;
}

/// Outbound email delivery
#[async_trait::async_trait]
pub trait EmailManager: Send + Sync {
    /// Send the email-verification message carrying the given token
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails.
    async fn send_verification_email(&self, user: &User, token: &str) -> AppResult<()>;

    /// Send the magic-link login message carrying the given token
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails.
    async fn send_login_email(&self, user: &User, token: &str) -> AppResult<()>;
}

/// Best-effort audit trail
#[async_trait::async_trait]
pub trait AuditLog: Send + Sync {
    /// Record an event; callers log and discard failures
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the event.
    async fn record(&self, event: AuditEvent, user_id: Uuid) -> AppResult<()>;
}

/// Optional billing collaborator
#[async_trait::async_trait]
pub trait BillingHook: Send + Sync {
    /// Link unassociated subscriptions and billing events matching an email
    ///
    /// # Errors
    ///
    /// Returns an error if the billing backend rejects the call.
    async fn link_unassociated(&self, email: &str) -> AppResult<()>;
}
