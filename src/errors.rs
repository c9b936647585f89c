// ABOUTME: Unified error handling with stable alphanumeric error codes
// ABOUTME: Maps every error kind to an HTTP status and a wire envelope
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

//! # Unified Error Handling System
//!
//! Every failure the service can surface is one of the [`ErrorCode`] kinds.
//! Each kind carries a stable alphanumeric code (`AM00-…`) that clients may
//! match on, a human title, and a fixed HTTP status. The mapping is a static
//! table; the HTTP layer renders it as the
//! `{title, detail, status_code, code}` envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable error kinds used throughout the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Client-malformed (400)
    BadRequest,
    InvalidUserBody,
    InvalidUserEmail,
    InvalidUserId,
    InvalidAuthToken,
    InvalidRefreshToken,
    InvalidApiTokenId,
    InvalidCreateUserApiTokenBody,
    TtlTooShort,
    TtlTooLong,
    TtlOutsideAllowedIncrement,

    // Auth-rejected (401)
    InvalidVerificationToken,
    UnauthorizedTokenNotFoundInStore,
    UnauthorizedAdminAccessAttempted,
    UnauthorizedNonActiveStatus,
    UnauthorizedUnableToAttainRequestorId,
    UnauthorizedRefreshTokenCacheDeletionFailure,
    UnauthorizedAccessTokenCacheDeletionFailure,
    ProviderCookieNotFound,
    ProviderInvalidProtectionStateToken,

    // Forbidden (403)
    ForbiddenUnableToAction,

    // State conflict (409)
    ConflictingUserState,
    UserStatusUncaught,
    PermanentApiTokenLimitReached,
    EphemeralApiTokenLimitReached,
    ApiTokenNotAssociatedWithUser,

    // Internal (500)
    InternalError,
}

impl ErrorCode {
    /// Stable alphanumeric code exposed to clients
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::BadRequest => "AM00-001",
            Self::InvalidUserBody => "AM00-002",
            Self::InvalidUserEmail => "AM00-003",
            Self::InvalidUserId => "AM00-004",
            Self::InvalidAuthToken => "AM00-005",
            Self::InvalidRefreshToken => "AM00-006",
            Self::InvalidApiTokenId => "AM00-007",
            Self::InvalidCreateUserApiTokenBody => "AM00-008",
            Self::TtlTooShort => "AM00-009",
            Self::TtlTooLong => "AM00-010",
            Self::TtlOutsideAllowedIncrement => "AM00-011",
            Self::InvalidVerificationToken => "AM00-012",
            Self::UnauthorizedTokenNotFoundInStore => "AM00-013",
            Self::UnauthorizedAdminAccessAttempted => "AM00-014",
            Self::UnauthorizedNonActiveStatus => "AM00-015",
            Self::UnauthorizedUnableToAttainRequestorId => "AM00-016",
            Self::UnauthorizedRefreshTokenCacheDeletionFailure => "AM00-017",
            Self::UnauthorizedAccessTokenCacheDeletionFailure => "AM00-018",
            Self::ProviderCookieNotFound => "AM00-019",
            Self::ProviderInvalidProtectionStateToken => "AM00-020",
            Self::ForbiddenUnableToAction => "AM00-021",
            Self::ConflictingUserState => "AM00-022",
            Self::UserStatusUncaught => "AM00-023",
            Self::PermanentApiTokenLimitReached => "AM00-024",
            Self::EphemeralApiTokenLimitReached => "AM00-025",
            Self::ApiTokenNotAssociatedWithUser => "AM00-026",
            Self::InternalError => "AM00-027",
        }
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            Self::BadRequest
            | Self::InvalidUserBody
            | Self::InvalidUserEmail
            | Self::InvalidUserId
            | Self::InvalidAuthToken
            | Self::InvalidRefreshToken
            | Self::InvalidApiTokenId
            | Self::InvalidCreateUserApiTokenBody
            | Self::TtlTooShort
            | Self::TtlTooLong
            | Self::TtlOutsideAllowedIncrement => StatusCode::BAD_REQUEST,

            // A verification token absent from the store is a rejected
            // credential, not a malformed request.
            Self::InvalidVerificationToken
            | Self::UnauthorizedTokenNotFoundInStore
            | Self::UnauthorizedAdminAccessAttempted
            | Self::UnauthorizedNonActiveStatus
            | Self::UnauthorizedUnableToAttainRequestorId
            | Self::UnauthorizedRefreshTokenCacheDeletionFailure
            | Self::UnauthorizedAccessTokenCacheDeletionFailure
            | Self::ProviderCookieNotFound
            | Self::ProviderInvalidProtectionStateToken => StatusCode::UNAUTHORIZED,

            Self::ForbiddenUnableToAction => StatusCode::FORBIDDEN,

            Self::ConflictingUserState
            | Self::UserStatusUncaught
            | Self::PermanentApiTokenLimitReached
            | Self::EphemeralApiTokenLimitReached
            | Self::ApiTokenNotAssociatedWithUser => StatusCode::CONFLICT,

            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable title for the wire envelope
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::BadRequest => "Bad request",
            Self::InvalidUserBody => "Invalid user body",
            Self::InvalidUserEmail => "Invalid user email",
            Self::InvalidUserId => "Invalid user ID",
            Self::InvalidAuthToken => "Invalid auth token",
            Self::InvalidRefreshToken => "Invalid refresh token",
            Self::InvalidApiTokenId => "Invalid API token ID",
            Self::InvalidCreateUserApiTokenBody => "Invalid create API token body",
            Self::TtlTooShort => "TTL below the role minimum",
            Self::TtlTooLong => "TTL above the role maximum",
            Self::TtlOutsideAllowedIncrement => "TTL not on the role increment",
            Self::InvalidVerificationToken => "Invalid verification token",
            Self::UnauthorizedTokenNotFoundInStore => "Token not found in session store",
            Self::UnauthorizedAdminAccessAttempted => "Admin access attempted",
            Self::UnauthorizedNonActiveStatus => "Account is not active",
            Self::UnauthorizedUnableToAttainRequestorId => "Unable to attain requestor ID",
            Self::UnauthorizedRefreshTokenCacheDeletionFailure => {
                "Refresh token could not be retired"
            }
            Self::UnauthorizedAccessTokenCacheDeletionFailure => {
                "Access token could not be retired"
            }
            Self::ProviderCookieNotFound => "Provider state cookie not found",
            Self::ProviderInvalidProtectionStateToken => "Provider state token mismatch",
            Self::ForbiddenUnableToAction => "Forbidden to action this resource",
            Self::ConflictingUserState => "Conflicting user state",
            Self::UserStatusUncaught => "User status not actionable",
            Self::PermanentApiTokenLimitReached => "Permanent API token limit reached",
            Self::EphemeralApiTokenLimitReached => "Ephemeral API token limit reached",
            Self::ApiTokenNotAssociatedWithUser => "API token not associated with user",
            Self::InternalError => "Internal server error",
        }
    }
}

/// Unified error type for the service
#[derive(Debug, Error)]
pub struct AppError {
    /// Error kind
    pub code: ErrorCode,
    /// Human-readable detail for the wire envelope
    pub detail: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given kind and detail
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
            source: None,
        }
    }

    /// Create an `AppError` with only the kind's title as detail
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.title())
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Internal server error
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, detail)
    }

    /// Malformed client request
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, detail)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {}",
            self.code.title(),
            self.code.code(),
            self.detail
        )
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Wire envelope for error responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub title: String,
    pub detail: String,
    pub status_code: u16,
    pub code: String,
}

impl From<&AppError> for ErrorEnvelope {
    fn from(error: &AppError) -> Self {
        Self {
            title: error.code.title().to_owned(),
            detail: error.detail.clone(),
            status_code: error.code.http_status().as_u16(),
            code: error.code.code().to_owned(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Internal details never leave the process; the envelope carries the
        // static title instead.
        let envelope = if self.code == ErrorCode::InternalError {
            tracing::error!("internal error: {}", self.detail);
            ErrorEnvelope {
                title: self.code.title().to_owned(),
                detail: self.code.title().to_owned(),
                status_code: self.code.http_status().as_u16(),
                code: self.code.code().to_owned(),
            }
        } else {
            ErrorEnvelope::from(&self)
        };
        (self.code.http_status(), Json(envelope)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(ErrorCode::InternalError, error.to_string())
    }
}
