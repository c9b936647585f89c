// ABOUTME: Identity route handlers for signup, login, logout, and OAuth
// ABOUTME: Thin wrappers that delegate every flow to the access manager
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

//! Identity endpoint handlers.
//!
//! Handlers stay thin: request mapping, cookie work, and status codes live
//! here; every decision lives in the access manager.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use super::types::{
    LoginRequest, OAuthLoginQuery, RefreshRequest, SessionExpiryResponse, SignupRequest,
    SignupResponse, TokenQuery,
};
use crate::auth::TokenPair;
use crate::constants::headers as header_names;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::resources::ServerResources;
use crate::security::cookies::{
    self, append_set_cookies, build_cookie, clear_session_cookies, get_cookie_value,
    session_cookies,
};

/// POST `/signup`: create a user and send the verification email
///
/// # Errors
///
/// Rejects with `InvalidUserBody` on empty fields and with the access
/// manager's error kinds otherwise.
pub async fn signup(
    State(resources): State<Arc<ServerResources>>,
    Json(request): Json<SignupRequest>,
) -> AppResult<impl IntoResponse> {
    if request.first_name.trim().is_empty()
        || request.last_name.trim().is_empty()
        || request.email.trim().is_empty()
    {
        return Err(AppError::new(
            ErrorCode::InvalidUserBody,
            "first_name, last_name, and email are required",
        ));
    }

    let user = resources
        .access
        .create_user(
            &request.first_name,
            &request.last_name,
            &request.email,
            request.disable_verification,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id: user.id.to_string(),
            nano_id: user.nano_id,
            message: "account created; check your email to verify the address".into(),
        }),
    ))
}

/// POST `/login`: begin a magic-link login
///
/// Always answers 202 whatever the lookup or delivery outcome, so the
/// endpoint cannot be used to enumerate accounts. Only a request-mapping
/// failure (malformed body) surfaces an error, and that is rejected by the
/// extractor before this handler runs.
pub async fn login_begin(
    State(resources): State<Arc<ServerResources>>,
    Json(request): Json<LoginRequest>,
) -> impl IntoResponse {
    if let Err(e) = resources
        .access
        .create_initial_login_or_verification(&request.email)
        .await
    {
        // Swallowed to keep the 202 contract; real faults land in the logs.
        warn!("magic-link initiation failed: {e}");
    }
    StatusCode::ACCEPTED
}

/// GET `/login?t=<token>`: complete a magic-link login
///
/// # Errors
///
/// Rejects with `InvalidVerificationToken` when the link is spent or bad.
pub async fn login_complete(
    State(resources): State<Arc<ServerResources>>,
    Query(query): Query<TokenQuery>,
) -> AppResult<Response> {
    let pair = resources.access.login_user(&query.t).await?;
    Ok(session_response(&resources, &pair, StatusCode::OK))
}

/// GET `/verify/email?t=<token>`: verify the address and log the user in
///
/// # Errors
///
/// Rejects with `InvalidVerificationToken` or `ConflictingUserState`.
pub async fn verify_email(
    State(resources): State<Arc<ServerResources>>,
    Query(query): Query<TokenQuery>,
) -> AppResult<Response> {
    let pair = resources
        .access
        .validate_email_verification_code(&query.t)
        .await?;
    Ok(session_response(&resources, &pair, StatusCode::OK))
}

/// GET `/logout`: clear cookies and retire the access entry
///
/// Answers 202 when no auth cookie is present and 200 after a real logout.
/// The refresh entry is left to its TTL; see the access manager notes.
///
/// # Errors
///
/// Rejects with the logout error kinds when the presented token is bad.
pub async fn logout(
    State(resources): State<Arc<ServerResources>>,
    request_headers: HeaderMap,
) -> AppResult<Response> {
    let Some(token) = get_cookie_value(&request_headers, &resources.cookie_names.access()) else {
        // No session cookie, nothing to retire.
        return Ok(StatusCode::ACCEPTED.into_response());
    };

    resources.access.logout(&token).await?;

    let mut response = StatusCode::OK.into_response();
    append_set_cookies(
        response.headers_mut(),
        &clear_session_cookies(&resources.cookie_names, &resources.config.environment),
    );
    Ok(response)
}

/// POST `/tokens/refresh`: rotate the access and refresh pair
///
/// Tokens arrive in the body or ride in on the session cookies.
///
/// # Errors
///
/// Rejects with `InvalidRefreshToken` or
/// `UnauthorizedRefreshTokenCacheDeletionFailure`.
pub async fn refresh(
    State(resources): State<Arc<ServerResources>>,
    request_headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> AppResult<Response> {
    let Json(request) = body.unwrap_or_default();

    let refresh_token = request
        .refresh_token
        .or_else(|| get_cookie_value(&request_headers, &resources.cookie_names.refresh()))
        .ok_or_else(|| {
            AppError::new(ErrorCode::InvalidRefreshToken, "no refresh token presented")
        })?;
    let access_token = request
        .access_token
        .or_else(|| get_cookie_value(&request_headers, &resources.cookie_names.access()));

    let pair = resources
        .access
        .refresh(&refresh_token, access_token.as_deref())
        .await?;
    Ok(session_response(&resources, &pair, StatusCode::OK))
}

/// GET `/oauth/<provider>/login`: 307 to the provider, set the state cookie
///
/// # Errors
///
/// Rejects with `BadRequest` for unknown providers.
pub async fn oauth_login(
    State(resources): State<Arc<ServerResources>>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthLoginQuery>,
) -> AppResult<Response> {
    let start = resources
        .access
        .begin_provider_login(&provider, query.redirect.as_deref())?;

    let mut response = (
        StatusCode::TEMPORARY_REDIRECT,
        [(axum::http::header::LOCATION, start.auth_url.clone())],
    )
        .into_response();
    append_set_cookies(
        response.headers_mut(),
        &[build_cookie(
            &start.cookie_name,
            &start.cookie_value,
            start.cookie_max_age_secs,
            true,
            &resources.config.environment,
        )],
    );
    Ok(response)
}

/// GET `/oauth/<provider>/callback`: complete the OAuth round-trip
///
/// On success the session cookies are set, the state cookie is cleared, and
/// any requested post-login redirect rides back in `X-Web-Location`. On a
/// protection-state rejection the state cookie is cleared as well.
pub async fn oauth_callback(
    State(resources): State<Arc<ServerResources>>,
    Path(provider): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    request_headers: HeaderMap,
) -> Response {
    let request_cookies = cookies::parse_cookies(&request_headers);

    match resources
        .access
        .handle_provider_callback(&provider, &query, &request_cookies)
        .await
    {
        Ok(login) => {
            let mut response = session_response(&resources, &login.pair, StatusCode::OK);
            append_set_cookies(
                response.headers_mut(),
                &[cookies::clear_cookie(
                    &login.state_cookie_name,
                    &resources.config.environment,
                )],
            );
            if let Some(location) = login.redirect {
                if let Ok(value) = location.parse() {
                    response
                        .headers_mut()
                        .insert(header_names::WEB_LOCATION, value);
                }
            }
            response
        }
        Err(error) => {
            let clear_state = matches!(
                error.code,
                ErrorCode::ProviderInvalidProtectionStateToken | ErrorCode::ProviderCookieNotFound
            );
            let mut response = error.into_response();
            if clear_state {
                if let Some(adapter) = resources.access.oauth().find(&provider) {
                    append_set_cookies(
                        response.headers_mut(),
                        &[cookies::clear_cookie(
                            &adapter.cookie_key(),
                            &resources.config.environment,
                        )],
                    );
                }
            }
            response
        }
    }
}

/// Build the standard session response: cookies set, expiries in the body
pub(super) fn session_response(
    resources: &ServerResources,
    pair: &TokenPair,
    status: StatusCode,
) -> Response {
    let body = SessionExpiryResponse {
        access_expires_at: pair.access_expires_at,
        refresh_expires_at: pair.refresh_expires_at,
    };
    let mut response = (status, Json(body)).into_response();
    append_set_cookies(
        response.headers_mut(),
        &session_cookies(
            &resources.cookie_names,
            pair,
            &resources.config.environment,
        ),
    );
    response
}
