// ABOUTME: Authentication policy gates for request authorization
// ABOUTME: JWT, active-JWT, admin-JWT, API-token, and rate-limit-or-JWT paths
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AMS Works

//! # Auth Middleware
//!
//! Every gate shares a preamble: when the auth cookie is present and no
//! `Authorization` header is set, the cookie value is copied into a bearer
//! header so browser and API clients travel the same token-authority path.
//! Every gate ends by injecting the resolved [`RequestorId`] into request
//! extensions. Token contents are never logged.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::auth::{AccessDescriptor, TokenAuthority, TokenValidationError};
use crate::context::RequestorId;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::middleware::rate_limiting::client_ip;
use crate::resources::ServerResources;
use crate::security::cookies::{get_cookie_value, CookieNames};
use crate::services::{ApiTokenService, UserService};
use crate::store::SessionStore;

/// Shared implementation behind every policy gate
#[derive(Clone)]
pub struct AuthGateway {
    authority: Arc<TokenAuthority>,
    store: SessionStore,
    users: Arc<dyn UserService>,
    api_tokens: Arc<dyn ApiTokenService>,
    cookie_names: CookieNames,
}

impl AuthGateway {
    #[must_use]
    pub fn new(
        authority: Arc<TokenAuthority>,
        store: SessionStore,
        users: Arc<dyn UserService>,
        api_tokens: Arc<dyn ApiTokenService>,
        cookie_names: CookieNames,
    ) -> Self {
        Self {
            authority,
            store,
            users,
            api_tokens,
            cookie_names,
        }
    }

    /// Common preamble: surface the auth cookie as a bearer header
    ///
    /// Returns the effective headers the token authority should read.
    #[must_use]
    pub fn effective_headers(&self, request_headers: &HeaderMap) -> HeaderMap {
        if request_headers.contains_key(header::AUTHORIZATION) {
            return request_headers.clone();
        }
        let mut effective = request_headers.clone();
        if let Some(token) = get_cookie_value(request_headers, &self.cookie_names.access()) {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                effective.insert(header::AUTHORIZATION, value);
            }
        }
        effective
    }

    /// Parse the bearer and confirm its entry is live in the store
    ///
    /// # Errors
    ///
    /// Returns `InvalidAuthToken` on any parse failure and
    /// `UnauthorizedTokenNotFoundInStore` when the entry is revoked or gone.
    pub async fn require_jwt(&self, request_headers: &HeaderMap) -> AppResult<AccessDescriptor> {
        let headers = self.effective_headers(request_headers);
        let descriptor = self
            .authority
            .extract_access_metadata(&headers)
            .map_err(|e| {
                tracing::warn!("bearer rejected: {e}");
                AppError::new(ErrorCode::InvalidAuthToken, e.to_string())
            })?;
        self.confirm_live(&descriptor).await?;
        Ok(descriptor)
    }

    /// `require_jwt` plus a live-status check against the user store
    ///
    /// # Errors
    ///
    /// Additionally returns `UnauthorizedNonActiveStatus` when the account's
    /// current status is not ACTIVE.
    pub async fn require_active_jwt(
        &self,
        request_headers: &HeaderMap,
    ) -> AppResult<AccessDescriptor> {
        let descriptor = self.require_jwt(request_headers).await?;
        self.confirm_active(descriptor.user_id).await?;
        Ok(descriptor)
    }

    /// Admin gate: both the admin and authorised claims must be set
    ///
    /// # Errors
    ///
    /// Returns `UnauthorizedAdminAccessAttempted` when either claim is
    /// missing, on top of the `require_jwt` failure modes.
    pub async fn require_admin_jwt(
        &self,
        request_headers: &HeaderMap,
    ) -> AppResult<AccessDescriptor> {
        let headers = self.effective_headers(request_headers);
        let descriptor = self
            .authority
            .extract_access_metadata(&headers)
            .map_err(|e| AppError::new(ErrorCode::InvalidAuthToken, e.to_string()))?;

        if !descriptor.is_admin || !descriptor.is_authorised {
            tracing::warn!(
                "admin access attempted by non-admin user {}",
                descriptor.user_id
            );
            return Err(AppError::from_code(
                ErrorCode::UnauthorizedAdminAccessAttempted,
            ));
        }

        self.confirm_live(&descriptor).await?;
        Ok(descriptor)
    }

    /// Validate the `X-Api-Token` header and the owner's live status
    ///
    /// Updates the token's last-used timestamp best-effort.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAuthToken` when the header is absent,
    /// `UnauthorizedTokenNotFoundInStore` when the secret does not resolve
    /// to a live token, and `UnauthorizedNonActiveStatus` when the owner is
    /// not ACTIVE.
    pub async fn require_api_token(&self, request_headers: &HeaderMap) -> AppResult<RequestorId> {
        let presented = api_token_header(request_headers).ok_or_else(|| {
            AppError::new(ErrorCode::InvalidAuthToken, "missing X-Api-Token header")
        })?;

        let token = self
            .api_tokens
            .validate_secret(&presented)
            .await?
            .ok_or_else(|| {
                AppError::new(
                    ErrorCode::UnauthorizedTokenNotFoundInStore,
                    "API token not recognised",
                )
            })?;

        self.confirm_active(token.owner_user_id).await?;

        if let Err(e) = self.api_tokens.touch_last_used(token.id).await {
            tracing::warn!("failed to update api token last-used: {e}");
        }

        Ok(RequestorId(token.owner_user_id))
    }

    /// API token takes precedence when its header is present; JWT otherwise
    ///
    /// # Errors
    ///
    /// Propagates the failure modes of whichever path is taken.
    pub async fn api_token_or_jwt(&self, request_headers: &HeaderMap) -> AppResult<RequestorId> {
        if api_token_header(request_headers).is_some() {
            return self.require_api_token(request_headers).await;
        }
        let descriptor = self.require_jwt(request_headers).await?;
        Ok(RequestorId(descriptor.user_id))
    }

    /// As [`Self::api_token_or_jwt`] with the active-JWT path
    ///
    /// # Errors
    ///
    /// Propagates the failure modes of whichever path is taken.
    pub async fn api_token_or_active_jwt(
        &self,
        request_headers: &HeaderMap,
    ) -> AppResult<RequestorId> {
        if api_token_header(request_headers).is_some() {
            return self.require_api_token(request_headers).await;
        }
        let descriptor = self.require_active_jwt(request_headers).await?;
        Ok(RequestorId(descriptor.user_id))
    }

    /// Anonymous requests are rate-limit counted; bearers take the
    /// active-JWT path
    ///
    /// Only the distinguishable missing-bearer case is anonymous: a present
    /// but invalid bearer is rejected, not counted.
    ///
    /// # Errors
    ///
    /// Propagates the active-JWT failure modes for bearer requests.
    pub async fn rate_limit_or_active_jwt(
        &self,
        request_headers: &HeaderMap,
        peer: Option<SocketAddr>,
    ) -> AppResult<RequestorId> {
        let headers = self.effective_headers(request_headers);
        match self.authority.extract_access_metadata(&headers) {
            Ok(descriptor) => {
                self.confirm_live(&descriptor).await?;
                self.confirm_active(descriptor.user_id).await?;
                Ok(RequestorId(descriptor.user_id))
            }
            Err(TokenValidationError::NoBearer) => {
                let ip = client_ip(request_headers, peer);
                let count = self.store.add_request_count_entry(&ip).await?;
                tracing::debug!("anonymous request {count} in window for {ip}");
                Ok(RequestorId::anonymous())
            }
            Err(e) => Err(AppError::new(ErrorCode::InvalidAuthToken, e.to_string())),
        }
    }

    /// Liveness check against the ephemeral store
    async fn confirm_live(&self, descriptor: &AccessDescriptor) -> AppResult<()> {
        let live = self
            .store
            .fetch_auth(descriptor.user_id, descriptor.access_uuid)
            .await?;
        if live.is_none() {
            return Err(AppError::from_code(
                ErrorCode::UnauthorizedTokenNotFoundInStore,
            ));
        }
        Ok(())
    }

    /// Current-status check against the user store
    async fn confirm_active(&self, user_id: uuid::Uuid) -> AppResult<()> {
        let user = self.users.user_by_id(user_id).await?.ok_or_else(|| {
            AppError::from_code(ErrorCode::UnauthorizedUnableToAttainRequestorId)
        })?;
        if !user.is_active() {
            return Err(AppError::new(
                ErrorCode::UnauthorizedNonActiveStatus,
                format!("account status is {}", user.status),
            ));
        }
        Ok(())
    }
}

/// Read the `X-Api-Token` header, if present
fn api_token_header(request_headers: &HeaderMap) -> Option<String> {
    request_headers
        .get(crate::constants::headers::API_TOKEN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// axum layer: `jwt_required`
///
/// # Errors
///
/// Rejects with the gate's error kinds.
pub async fn gate_jwt(
    State(resources): State<Arc<ServerResources>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let descriptor = resources.gateway.require_jwt(request.headers()).await?;
    request
        .extensions_mut()
        .insert(RequestorId(descriptor.user_id));
    Ok(next.run(request).await)
}

/// axum layer: `active_jwt_required`
///
/// # Errors
///
/// Rejects with the gate's error kinds.
pub async fn gate_active_jwt(
    State(resources): State<Arc<ServerResources>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let descriptor = resources
        .gateway
        .require_active_jwt(request.headers())
        .await?;
    request
        .extensions_mut()
        .insert(RequestorId(descriptor.user_id));
    Ok(next.run(request).await)
}

/// axum layer: `admin_jwt_required`
///
/// # Errors
///
/// Rejects with the gate's error kinds.
pub async fn gate_admin_jwt(
    State(resources): State<Arc<ServerResources>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let descriptor = resources
        .gateway
        .require_admin_jwt(request.headers())
        .await?;
    request
        .extensions_mut()
        .insert(RequestorId(descriptor.user_id));
    Ok(next.run(request).await)
}

/// axum layer: `valid_api_token_required`
///
/// # Errors
///
/// Rejects with the gate's error kinds.
pub async fn gate_api_token(
    State(resources): State<Arc<ServerResources>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let requestor = resources
        .gateway
        .require_api_token(request.headers())
        .await?;
    request.extensions_mut().insert(requestor);
    Ok(next.run(request).await)
}

/// axum layer: `api_token_or_jwt`
///
/// # Errors
///
/// Rejects with the gate's error kinds.
pub async fn gate_api_token_or_jwt(
    State(resources): State<Arc<ServerResources>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let requestor = resources
        .gateway
        .api_token_or_jwt(request.headers())
        .await?;
    request.extensions_mut().insert(requestor);
    Ok(next.run(request).await)
}

/// axum layer: `api_token_or_active_jwt`
///
/// # Errors
///
/// Rejects with the gate's error kinds.
pub async fn gate_api_token_or_active_jwt(
    State(resources): State<Arc<ServerResources>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let requestor = resources
        .gateway
        .api_token_or_active_jwt(request.headers())
        .await?;
    request.extensions_mut().insert(requestor);
    Ok(next.run(request).await)
}

/// axum layer: `rate_limit_or_active_jwt`
///
/// # Errors
///
/// Rejects with the gate's error kinds.
pub async fn gate_rate_limit_or_active_jwt(
    State(resources): State<Arc<ServerResources>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let requestor = resources
        .gateway
        .rate_limit_or_active_jwt(request.headers(), peer)
        .await?;
    request.extensions_mut().insert(requestor);
    Ok(next.run(request).await)
}
