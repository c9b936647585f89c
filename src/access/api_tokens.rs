// ABOUTME: API-token lifecycle gated by per-role quota thresholds
// ABOUTME: Count limits first, then TTL range and increment validation
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

use super::AccessManager;
use crate::constants::pagination;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{ApiToken, ApiTokenStatus, RoleThreshold};
use tracing::info;
use uuid::Uuid;

/// A user's quota report: the role thresholds plus live counts
#[derive(Debug, Clone)]
pub struct ThresholdReport {
    pub threshold: RoleThreshold,
    pub permanent_count: usize,
    pub ephemeral_count: usize,
}

impl AccessManager {
    /// Create an API token for a user, enforcing role thresholds
    ///
    /// `ttl_seconds == 0` requests a permanent token. Counts are checked
    /// before the TTL is validated; both use the user's highest-ranked role.
    ///
    /// # Errors
    ///
    /// Returns `PermanentAPITokenLimitReached` / `EphemeralAPITokenLimitReached`
    /// when the quota is exhausted, and the TTL error kinds when the
    /// requested lifetime is out of range.
    pub async fn create_user_api_token(
        &self,
        user_id: Uuid,
        ttl_seconds: u64,
    ) -> AppResult<(ApiToken, String)> {
        let user = self
            .users
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::from_code(ErrorCode::InvalidUserId))?;

        let threshold = RoleThreshold::for_role(user.highest_role());
        let existing = self.scan_tokens(user_id).await?;
        let permanent_count = existing.iter().filter(|t| t.is_permanent()).count();
        let ephemeral_count = existing.len() - permanent_count;

        if ttl_seconds == 0 && permanent_count >= threshold.permanent_limit {
            return Err(AppError::new(
                ErrorCode::PermanentApiTokenLimitReached,
                format!(
                    "{} role allows {} permanent tokens",
                    threshold.role, threshold.permanent_limit
                ),
            ));
        }
        if ttl_seconds > 0 && ephemeral_count >= threshold.ephemeral_limit {
            return Err(AppError::new(
                ErrorCode::EphemeralApiTokenLimitReached,
                format!(
                    "{} role allows {} ephemeral tokens",
                    threshold.role, threshold.ephemeral_limit
                ),
            ));
        }

        threshold.validate_ttl(ttl_seconds)?;

        let (token, secret) = self.api_tokens.create_token(&user, ttl_seconds).await?;
        info!("api token {} created for user {}", token.id, user_id);
        Ok((token, secret))
    }

    /// List a user's API tokens (first page, quota-scan sized)
    ///
    /// # Errors
    ///
    /// Returns an error if the token service read fails.
    pub async fn list_user_api_tokens(&self, user_id: Uuid) -> AppResult<Vec<ApiToken>> {
        self.scan_tokens(user_id).await
    }

    /// Delete an API token after verifying it belongs to the user
    ///
    /// # Errors
    ///
    /// Returns `APITokenNotAssociatedWithUser` when the token is not among
    /// the user's tokens.
    pub async fn delete_user_api_token(&self, user_id: Uuid, token_id: Uuid) -> AppResult<()> {
        let tokens = self.scan_tokens(user_id).await?;
        if !tokens.iter().any(|t| t.id == token_id) {
            return Err(AppError::from_code(ErrorCode::ApiTokenNotAssociatedWithUser));
        }
        self.api_tokens.delete_token(token_id).await?;
        info!("api token {token_id} deleted for user {user_id}");
        Ok(())
    }

    /// Update a token's status: ACTIVE activates, anything else revokes
    ///
    /// # Errors
    ///
    /// Returns an error if the token service write fails.
    pub async fn update_user_api_token_status(
        &self,
        token_id: Uuid,
        status: ApiTokenStatus,
    ) -> AppResult<()> {
        match status {
            ApiTokenStatus::Active => self.api_tokens.activate_token(token_id).await,
            ApiTokenStatus::Revoked => self.api_tokens.revoke_token(token_id).await,
        }
    }

    /// Report the user's role thresholds and live token counts
    ///
    /// # Errors
    ///
    /// Returns `InvalidUserID` when the user does not exist.
    pub async fn user_token_thresholds(&self, user_id: Uuid) -> AppResult<ThresholdReport> {
        let user = self
            .users
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::from_code(ErrorCode::InvalidUserId))?;

        let threshold = *RoleThreshold::for_role(user.highest_role());
        let existing = self.scan_tokens(user_id).await?;
        let permanent_count = existing.iter().filter(|t| t.is_permanent()).count();

        Ok(ThresholdReport {
            threshold,
            permanent_count,
            ephemeral_count: existing.len() - permanent_count,
        })
    }

    /// First page of a user's tokens, bounded by the quota scan limit.
    /// Users holding more than the limit are not fully counted; the default
    /// quotas keep that theoretical.
    async fn scan_tokens(&self, user_id: Uuid) -> AppResult<Vec<ApiToken>> {
        self.api_tokens
            .tokens_for_user(user_id, 1, pagination::API_TOKEN_SCAN_LIMIT)
            .await
    }
}
