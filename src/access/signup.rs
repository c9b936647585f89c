// ABOUTME: Signup and email verification flows
// ABOUTME: Creates provisioned accounts and promotes them on verification
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

use super::AccessManager;
use crate::auth::{EphemeralKind, TokenPair};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{User, UserStatus};
use crate::services::AuditEvent;
use crate::store;
use tracing::{info, warn};

impl AccessManager {
    /// Create a new user account and send the verification email
    ///
    /// `disable_verification` skips the outbound email; the SSO signup path
    /// uses it because the provider already vouches for the address.
    ///
    /// # Errors
    ///
    /// Returns an error if the user service rejects the account (duplicate
    /// or malformed email) or if token minting / storage fails.
    pub async fn create_user(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        disable_verification: bool,
    ) -> AppResult<User> {
        let user = self.users.create_user(first_name, last_name, email).await?;
        info!("user account created: {}", user.id);

        self.audit_best_effort(AuditEvent::UserAccountNew, user.id).await;

        // Billing linkage is opportunistic; a failure never blocks signup.
        if let Some(billing) = &self.billing {
            if let Err(e) = billing.link_unassociated(&user.email).await {
                warn!("billing linkage failed for {}: {}", user.id, e);
            }
        }

        if !disable_verification {
            self.send_verification(&user).await?;
        }

        Ok(user)
    }

    /// Mint, store, and email a verification token for a provisioned user
    pub(crate) async fn send_verification(&self, user: &User) -> AppResult<()> {
        let minted = self
            .authority
            .create_ephemeral_token(user, EphemeralKind::EmailVerification)?;
        self.store
            .store_token(user.id, minted.uuid, minted.ttl)
            .await?;
        self.email
            .send_verification_email(user, &minted.token)
            .await?;
        Ok(())
    }

    /// Validate an email-verification token and log the user in
    ///
    /// The token is single-use: its store entry is deleted once consumed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidVerificationToken` when the token fails to parse or
    /// its entry is absent from the store, and `ConflictingUserState` when
    /// the account cannot transition to ACTIVE.
    pub async fn validate_email_verification_code(&self, token: &str) -> AppResult<TokenPair> {
        let descriptor = self
            .authority
            .parse_ephemeral_string(token, EphemeralKind::EmailVerification)
            .map_err(|e| {
                AppError::new(ErrorCode::InvalidVerificationToken, e.to_string())
            })?;

        let live = self
            .store
            .fetch_auth(descriptor.user_id, descriptor.ephemeral_uuid)
            .await?;
        if live.is_none() {
            return Err(AppError::from_code(ErrorCode::InvalidVerificationToken));
        }

        let user = self
            .users
            .user_by_id(descriptor.user_id)
            .await?
            .ok_or_else(|| AppError::from_code(ErrorCode::InvalidVerificationToken))?;

        let pair = self.activate_and_issue(user).await?;

        // One-shot: retire the verification entry after the session exists.
        let key = store::combined_key(descriptor.user_id, descriptor.ephemeral_uuid);
        self.store.delete_auth(&key).await?;

        Ok(pair)
    }

    /// Mark the email verified, promote PROVISIONED → ACTIVE, save, and
    /// issue a stored token pair
    ///
    /// Shared by email verification and the SSO first-login path.
    pub(crate) async fn activate_and_issue(&self, mut user: User) -> AppResult<TokenPair> {
        user.mark_email_verified();
        user.transition_to(UserStatus::Active)?;
        user.record_login(true);
        self.users.save_user(&user).await?;

        self.issue_session(&user).await
    }
}
