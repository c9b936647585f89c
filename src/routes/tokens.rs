// ABOUTME: API token route handlers and session management for users
// ABOUTME: Per-user endpoints require the path user to be the requestor
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use std::sync::Arc;
use uuid::Uuid;

use super::types::{
    ApiTokenResponse, CreateApiTokenRequest, MessageResponse, ThresholdsResponse,
};
use crate::auth::bearer_from_headers;
use crate::context::RequestorId;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::ApiTokenStatus;
use crate::resources::ServerResources;
use crate::security::cookies::get_cookie_value;

/// POST `/users/{userID}/tokens`: create an API token
///
/// # Errors
///
/// Rejects with the quota and TTL error kinds, and
/// `ForbiddenUnableToAction` when the path user is not the requestor.
pub async fn create(
    State(resources): State<Arc<ServerResources>>,
    Extension(requestor): Extension<RequestorId>,
    Path(user_id): Path<String>,
    Json(request): Json<CreateApiTokenRequest>,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&user_id)?;
    require_self(user_id, requestor)?;

    let (token, secret) = resources
        .access
        .create_user_api_token(user_id, request.ttl_seconds)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiTokenResponse::from_created(&token, secret)),
    ))
}

/// GET `/users/{userID}/tokens`: list the user's API tokens
///
/// # Errors
///
/// Rejects with `ForbiddenUnableToAction` when the path user is not the
/// requestor.
pub async fn list(
    State(resources): State<Arc<ServerResources>>,
    Extension(requestor): Extension<RequestorId>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<ApiTokenResponse>>> {
    let user_id = parse_user_id(&user_id)?;
    require_self(user_id, requestor)?;

    let tokens = resources.access.list_user_api_tokens(user_id).await?;
    Ok(Json(
        tokens.iter().map(ApiTokenResponse::from_token).collect(),
    ))
}

/// DELETE `/users/{userID}/tokens/{tokenID}`: delete an API token
///
/// # Errors
///
/// Rejects with `APITokenNotAssociatedWithUser` when the token does not
/// belong to the user.
pub async fn delete(
    State(resources): State<Arc<ServerResources>>,
    Extension(requestor): Extension<RequestorId>,
    Path((user_id, token_id)): Path<(String, String)>,
) -> AppResult<Json<MessageResponse>> {
    let user_id = parse_user_id(&user_id)?;
    require_self(user_id, requestor)?;
    let token_id = parse_token_id(&token_id)?;

    resources
        .access
        .delete_user_api_token(user_id, token_id)
        .await?;
    Ok(Json(MessageResponse::new("token deleted")))
}

/// PUT `/users/{userID}/tokens/{tokenID}/activate`
///
/// # Errors
///
/// Rejects with the token service's error kinds.
pub async fn activate(
    State(resources): State<Arc<ServerResources>>,
    Extension(requestor): Extension<RequestorId>,
    Path((user_id, token_id)): Path<(String, String)>,
) -> AppResult<Json<MessageResponse>> {
    update_status(&resources, requestor, &user_id, &token_id, ApiTokenStatus::Active).await?;
    Ok(Json(MessageResponse::new("token activated")))
}

/// PUT `/users/{userID}/tokens/{tokenID}/revoke`
///
/// # Errors
///
/// Rejects with the token service's error kinds.
pub async fn revoke(
    State(resources): State<Arc<ServerResources>>,
    Extension(requestor): Extension<RequestorId>,
    Path((user_id, token_id)): Path<(String, String)>,
) -> AppResult<Json<MessageResponse>> {
    update_status(&resources, requestor, &user_id, &token_id, ApiTokenStatus::Revoked).await?;
    Ok(Json(MessageResponse::new("token revoked")))
}

/// GET `/users/{userID}/tokens/thresholds`: report the user's quotas
///
/// # Errors
///
/// Rejects with `ForbiddenUnableToAction` when the path user is not the
/// requestor.
pub async fn thresholds(
    State(resources): State<Arc<ServerResources>>,
    Extension(requestor): Extension<RequestorId>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ThresholdsResponse>> {
    let user_id = parse_user_id(&user_id)?;
    require_self(user_id, requestor)?;

    let report = resources.access.user_token_thresholds(user_id).await?;
    Ok(Json(report.into()))
}

/// GET `/logout/other-sessions`: invalidate every other session
///
/// The current access and refresh tokens are read from the bearer header
/// and cookies; their entries are the only ones that survive.
///
/// # Errors
///
/// Rejects when either current token is missing or unparseable.
pub async fn logout_other_sessions(
    State(resources): State<Arc<ServerResources>>,
    Extension(requestor): Extension<RequestorId>,
    request_headers: HeaderMap,
) -> AppResult<Json<MessageResponse>> {
    let access_token = bearer_from_headers(&request_headers)
        .or_else(|| get_cookie_value(&request_headers, &resources.cookie_names.access()))
        .ok_or_else(|| {
            AppError::new(ErrorCode::InvalidAuthToken, "no current access token presented")
        })?;
    let refresh_token = get_cookie_value(&request_headers, &resources.cookie_names.refresh())
        .ok_or_else(|| {
            AppError::new(
                ErrorCode::InvalidRefreshToken,
                "no current refresh token presented",
            )
        })?;

    let removed = resources
        .access
        .logout_other_sessions(requestor.0, &access_token, &refresh_token)
        .await?;
    Ok(Json(MessageResponse::new(format!(
        "{removed} other sessions invalidated"
    ))))
}

async fn update_status(
    resources: &ServerResources,
    requestor: RequestorId,
    user_id: &str,
    token_id: &str,
    status: ApiTokenStatus,
) -> AppResult<()> {
    let user_id = parse_user_id(user_id)?;
    require_self(user_id, requestor)?;
    let token_id = parse_token_id(token_id)?;
    resources
        .access
        .update_user_api_token_status(token_id, status)
        .await
}

fn parse_user_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| AppError::new(ErrorCode::InvalidUserId, format!("not a user ID: {raw}")))
}

fn parse_token_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| {
        AppError::new(ErrorCode::InvalidApiTokenId, format!("not a token ID: {raw}"))
    })
}

/// Per-user endpoints only ever act on the requestor's own resources
fn require_self(user_id: Uuid, requestor: RequestorId) -> AppResult<()> {
    if RequestorId(user_id) != requestor {
        return Err(AppError::from_code(ErrorCode::ForbiddenUnableToAction));
    }
    Ok(())
}
