// ABOUTME: Passwordless login, refresh rotation, and logout flows
// ABOUTME: Magic links for ACTIVE users, verification resend for PROVISIONED
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

use super::AccessManager;
use crate::auth::{EphemeralKind, TokenPair};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::UserStatus;
use crate::services::AuditEvent;
use crate::store;
use tracing::{info, warn};
use uuid::Uuid;

impl AccessManager {
    /// Begin a magic-link login for the given email
    ///
    /// ACTIVE accounts get a login link, PROVISIONED accounts get a fresh
    /// verification email. The HTTP handler answers 202 regardless of the
    /// outcome here, to avoid user enumeration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUserEmail` for unknown addresses and
    /// `UserStatusUncaught` for accounts in any other state.
    pub async fn create_initial_login_or_verification(&self, email: &str) -> AppResult<()> {
        let user = self
            .users
            .user_by_email(email)
            .await?
            .ok_or_else(|| AppError::from_code(ErrorCode::InvalidUserEmail))?;

        match user.status {
            UserStatus::Active => {
                let minted = self
                    .authority
                    .create_ephemeral_token(&user, EphemeralKind::InitialLogin)?;
                self.store
                    .store_token(user.id, minted.uuid, minted.ttl)
                    .await?;
                self.email.send_login_email(&user, &minted.token).await?;
                Ok(())
            }
            UserStatus::Provisioned => self.send_verification(&user).await,
            other => Err(AppError::new(
                ErrorCode::UserStatusUncaught,
                format!("no login path for status {other}"),
            )),
        }
    }

    /// Complete a magic-link login
    ///
    /// Mirrors email verification without the verification bit-flipping;
    /// only the login timestamps move.
    ///
    /// # Errors
    ///
    /// Returns `InvalidVerificationToken` when the token fails to parse or
    /// its entry is absent from the store (already used or expired).
    pub async fn login_user(&self, token: &str) -> AppResult<TokenPair> {
        let descriptor = self
            .authority
            .parse_ephemeral_string(token, EphemeralKind::InitialLogin)
            .map_err(|e| AppError::new(ErrorCode::InvalidVerificationToken, e.to_string()))?;

        let live = self
            .store
            .fetch_auth(descriptor.user_id, descriptor.ephemeral_uuid)
            .await?;
        if live.is_none() {
            return Err(AppError::from_code(ErrorCode::InvalidVerificationToken));
        }

        let mut user = self
            .users
            .user_by_id(descriptor.user_id)
            .await?
            .ok_or_else(|| AppError::from_code(ErrorCode::InvalidVerificationToken))?;

        user.record_login(true);
        self.users.save_user(&user).await?;

        let pair = self.issue_session(&user).await?;
        self.audit_best_effort(AuditEvent::UserLogin, user.id).await;

        // One-shot: the link is dead after a single use.
        let key = store::combined_key(descriptor.user_id, descriptor.ephemeral_uuid);
        self.store.delete_auth(&key).await?;

        Ok(pair)
    }

    /// Rotate a refresh token into a fresh pair
    ///
    /// The old refresh entry must still be live: its deletion has to remove
    /// exactly one entry, which is what makes an old refresh token unusable
    /// after rotation. An accompanying access token is retired best-effort.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRefreshToken` when parsing fails and
    /// `UnauthorizedRefreshTokenCacheDeletionFailure` when the entry was
    /// already gone.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        access_token: Option<&str>,
    ) -> AppResult<TokenPair> {
        let descriptor = self
            .authority
            .parse_refresh_string(refresh_token)
            .map_err(|e| AppError::new(ErrorCode::InvalidRefreshToken, e.to_string()))?;

        let user = self
            .users
            .user_by_id(descriptor.user_id)
            .await?
            .ok_or_else(|| AppError::from_code(ErrorCode::InvalidRefreshToken))?;

        let refresh_key = store::combined_key(descriptor.user_id, descriptor.refresh_uuid);
        let removed = self.store.delete_auth(&refresh_key).await?;
        if removed != 1 {
            return Err(AppError::from_code(
                ErrorCode::UnauthorizedRefreshTokenCacheDeletionFailure,
            ));
        }

        // Best-effort retirement of the old access entry.
        if let Some(token) = access_token {
            match self.authority.parse_access_string(token) {
                Ok(access) => {
                    let key = store::combined_key(access.user_id, access.access_uuid);
                    if let Err(e) = self.store.delete_auth(&key).await {
                        warn!("failed to retire access entry during refresh: {e}");
                    }
                }
                Err(e) => warn!("unparseable access token during refresh: {e}"),
            }
        }

        self.issue_session(&user).await
    }

    /// Log out the presented access token
    ///
    /// Deletes the access entry only. The refresh entry is deliberately left
    /// in place: the refresh secret is distinct, so an attacker holding only
    /// the access secret cannot mint refresh credentials, and the entry
    /// expires on its own TTL.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAuthToken` when parsing fails and
    /// `UnauthorizedAccessTokenCacheDeletionFailure` when the entry was
    /// already gone.
    pub async fn logout(&self, access_token: &str) -> AppResult<()> {
        let descriptor = self
            .authority
            .parse_access_string(access_token)
            .map_err(|e| AppError::new(ErrorCode::InvalidAuthToken, e.to_string()))?;

        let key = store::combined_key(descriptor.user_id, descriptor.access_uuid);
        let removed = self.store.delete_auth(&key).await?;
        if removed != 1 {
            return Err(AppError::from_code(
                ErrorCode::UnauthorizedAccessTokenCacheDeletionFailure,
            ));
        }

        self.audit_best_effort(AuditEvent::UserLogout, descriptor.user_id)
            .await;
        info!("user {} logged out", descriptor.user_id);
        Ok(())
    }

    /// Invalidate every session of a user except the current one
    ///
    /// Parses both presented tokens to derive their UUIDs, then removes all
    /// of the user's entries except those two.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAuthToken` / `InvalidRefreshToken` when the presented
    /// tokens fail to parse.
    pub async fn logout_other_sessions(
        &self,
        user_id: Uuid,
        current_access_token: &str,
        current_refresh_token: &str,
    ) -> AppResult<u64> {
        let access = self
            .authority
            .parse_access_string(current_access_token)
            .map_err(|e| AppError::new(ErrorCode::InvalidAuthToken, e.to_string()))?;
        let refresh = self
            .authority
            .parse_refresh_string(current_refresh_token)
            .map_err(|e| AppError::new(ErrorCode::InvalidRefreshToken, e.to_string()))?;

        let exempt = [
            store::combined_key(user_id, access.access_uuid),
            store::combined_key(user_id, refresh.refresh_uuid),
        ];
        let removed = self
            .store
            .delete_all_tokens_except(user_id, &exempt)
            .await?;
        info!("invalidated {removed} other sessions for user {user_id}");
        Ok(removed)
    }
}
