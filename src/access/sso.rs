// ABOUTME: OAuth callback protocol linking provider identities to accounts
// ABOUTME: Verifies protection state, fetches identity, issues sessions
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

use super::AccessManager;
use crate::auth::TokenPair;
use crate::constants::ttl;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::oauth::OAuthError;
use crate::services::AuditEvent;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::collections::HashMap;
use tracing::{info, warn};

/// Everything the OAuth login start hands back to the HTTP layer
#[derive(Debug, Clone)]
pub struct SsoStart {
    /// Provider authorization URL to redirect the browser to
    pub auth_url: String,
    /// Name of the protection-state cookie to set
    pub cookie_name: String,
    /// Value of the protection-state cookie
    pub cookie_value: String,
    /// Cookie lifetime in seconds
    pub cookie_max_age_secs: u64,
}

/// Everything a completed OAuth callback hands back to the HTTP layer
#[derive(Debug, Clone)]
pub struct SsoLogin {
    pub pair: TokenPair,
    /// Decoded post-login redirect URL, when the login start carried one
    pub redirect: Option<String>,
    /// Name of the state cookie the caller should clear
    pub state_cookie_name: String,
}

impl AccessManager {
    /// Begin an OAuth login: generate the protection state and auth URL
    ///
    /// When a post-login redirect is requested, it rides along base64-encoded
    /// after a `.` separator in the cookie value; the nonce before the
    /// separator is what the provider echoes back as `state`.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` for an unknown provider name.
    pub fn begin_provider_login(
        &self,
        provider: &str,
        redirect: Option<&str>,
    ) -> AppResult<SsoStart> {
        let adapter = self.oauth.find(provider).ok_or_else(|| {
            AppError::new(ErrorCode::BadRequest, format!("unknown provider: {provider}"))
        })?;

        let nonce = adapter.generate_protection_token();
        let cookie_value = match redirect {
            Some(url) if !url.is_empty() => {
                format!("{nonce}.{}", BASE64.encode(url.as_bytes()))
            }
            _ => nonce.clone(),
        };

        Ok(SsoStart {
            auth_url: adapter.auth_code_url(&nonce),
            cookie_name: adapter.cookie_key(),
            cookie_value,
            cookie_max_age_secs: ttl::OAUTH_STATE_COOKIE_SECS,
        })
    }

    /// Complete an OAuth callback for the named provider
    ///
    /// # Errors
    ///
    /// Returns `ProviderCookieNotFound` when the state cookie is missing,
    /// `ProviderInvalidProtectionStateToken` on a CSRF mismatch, and the
    /// account-flow errors of the signup/login paths otherwise.
    pub async fn handle_provider_callback(
        &self,
        provider: &str,
        query: &HashMap<String, String>,
        cookies: &HashMap<String, String>,
    ) -> AppResult<SsoLogin> {
        // Linear scan; non-matching adapters are skipped.
        for adapter in self.oauth.iter() {
            if adapter.name() != provider {
                continue;
            }

            let cookie_name = adapter.cookie_key();
            let cookie_value = cookies
                .get(&cookie_name)
                .ok_or_else(|| AppError::from_code(ErrorCode::ProviderCookieNotFound))?;

            let (state_cookie_name, authentic) =
                adapter.verify_request_is_authentic(query, cookie_value);
            if !authentic {
                return Err(AppError::from_code(
                    ErrorCode::ProviderInvalidProtectionStateToken,
                ));
            }

            let redirect = decode_redirect_suffix(cookie_value);

            let data = adapter.user_data(query).await.map_err(map_oauth_error)?;

            let (pair, user_id) = match self.users.user_by_email(&data.email).await? {
                Some(mut user) => {
                    user.record_login(true);
                    // Adopt the provider's verification when we lag behind it.
                    if data.email_verified && !user.email_verified {
                        user.mark_email_verified();
                    }
                    self.users.save_user(&user).await?;
                    let pair = self.issue_session(&user).await?;
                    self.audit_best_effort(AuditEvent::UserLoginSso, user.id).await;
                    (pair, user.id)
                }
                None => {
                    let mut user = self
                        .create_user(&data.first_name, &data.last_name, &data.email, true)
                        .await?;
                    if data.email_verified {
                        user.mark_email_verified();
                        self.users.save_user(&user).await?;
                    }
                    self.audit_best_effort(AuditEvent::UserAccountNewSso, user.id)
                        .await;
                    let user_id = user.id;
                    let pair = self.activate_and_issue(user).await?;
                    self.audit_best_effort(AuditEvent::UserLoginSso, user_id).await;
                    (pair, user_id)
                }
            };

            info!("SSO login completed via {provider} for user {user_id}");
            return Ok(SsoLogin {
                pair,
                redirect,
                state_cookie_name,
            });
        }

        Err(AppError::new(
            ErrorCode::BadRequest,
            format!("unknown provider: {provider}"),
        ))
    }
}

/// Decode the optional `.<base64>` redirect suffix of a state cookie
fn decode_redirect_suffix(cookie_value: &str) -> Option<String> {
    let (_, encoded) = cookie_value.split_once('.')?;
    match BASE64.decode(encoded) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("redirect suffix is not UTF-8: {e}");
                None
            }
        },
        Err(e) => {
            warn!("redirect suffix is not base64: {e}");
            None
        }
    }
}

fn map_oauth_error(error: OAuthError) -> AppError {
    match error {
        OAuthError::MissingCode => {
            AppError::new(ErrorCode::BadRequest, error.to_string())
        }
        OAuthError::Configuration(_)
        | OAuthError::TokenExchangeFailed(_)
        | OAuthError::UserInfoFailed(_) => AppError::internal(error.to_string()),
    }
}
