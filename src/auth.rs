// ABOUTME: JWT token authority minting and validating all bearer credentials
// ABOUTME: Access, refresh, email-verification, and initial-login token kinds
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

//! # Token Authority
//!
//! Mints, parses, and validates the four bearer token kinds carried as
//! HS256-signed JWTs. Access, email-verification, and initial-login tokens
//! share one signing secret; refresh tokens use a distinct secret so a
//! leaked access secret cannot forge refresh credentials.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::environment::TokenConfig;
use crate::errors::{AppError, ErrorCode};
use crate::models::User;

/// Token validation error with detailed information
#[derive(Debug, Clone, thiserror::Error)]
pub enum TokenValidationError {
    /// No `Authorization: Bearer …` header was present at all.
    /// Distinguishable so the rate-limit gate can take the anonymous path.
    #[error("no bearer token present on the request")]
    NoBearer,
    /// Token has expired
    #[error("token expired at {expired_at}")]
    TokenExpired {
        /// When the token expired
        expired_at: DateTime<Utc>,
    },
    /// Token signature is invalid
    #[error("token signature is invalid: {reason}")]
    TokenInvalid {
        /// Reason for invalidity
        reason: String,
    },
    /// Token is malformed (not proper JWT format)
    #[error("token is malformed: {details}")]
    TokenMalformed {
        /// Details about malformation
        details: String,
    },
}

impl TokenValidationError {
    /// Whether this failure is the distinguishable missing-bearer kind
    #[must_use]
    pub const fn is_no_bearer(&self) -> bool {
        matches!(self, Self::NoBearer)
    }
}

impl From<TokenValidationError> for AppError {
    fn from(error: TokenValidationError) -> Self {
        Self::new(ErrorCode::InvalidAuthToken, error.to_string())
    }
}

/// Ephemeral token kinds (single-use, short TTL)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EphemeralKind {
    EmailVerification,
    InitialLogin,
}

impl EphemeralKind {
    const fn claim_value(self) -> &'static str {
        match self {
            Self::EmailVerification => "verify",
            Self::InitialLogin => "login",
        }
    }
}

/// Access token claims
#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    /// User ID
    sub: Uuid,
    /// Token UUID, the ephemeral-store handle
    jti: Uuid,
    /// Admin role held at issuance
    adm: bool,
    /// User was ACTIVE at issuance
    act: bool,
    iat: i64,
    exp: i64,
}

/// Refresh token claims
#[derive(Debug, Serialize, Deserialize)]
struct RefreshClaims {
    sub: Uuid,
    jti: Uuid,
    iat: i64,
    exp: i64,
}

/// Magic-link / verification token claims
#[derive(Debug, Serialize, Deserialize)]
struct EphemeralClaims {
    sub: Uuid,
    jti: Uuid,
    /// Kind discriminator so a verification token cannot complete a login
    knd: String,
    iat: i64,
    exp: i64,
}

/// In-memory descriptor of a parsed access token
#[derive(Debug, Clone)]
pub struct AccessDescriptor {
    pub access_uuid: Uuid,
    pub user_id: Uuid,
    pub is_admin: bool,
    /// User was ACTIVE when the token was issued
    pub is_authorised: bool,
    pub expires_at: DateTime<Utc>,
}

/// In-memory descriptor of a parsed refresh token
#[derive(Debug, Clone)]
pub struct RefreshDescriptor {
    pub refresh_uuid: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// In-memory descriptor of a parsed ephemeral token
#[derive(Debug, Clone)]
pub struct EphemeralDescriptor {
    pub ephemeral_uuid: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// A freshly minted access + refresh pair
///
/// The caller is responsible for persisting both UUIDs in the ephemeral
/// store; nothing here touches storage.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub access_uuid: Uuid,
    pub refresh_uuid: Uuid,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// A freshly minted ephemeral token
#[derive(Debug, Clone)]
pub struct EphemeralToken {
    pub token: String,
    pub uuid: Uuid,
    pub ttl: std::time::Duration,
}

/// Token authority holding signing secrets and TTLs
pub struct TokenAuthority {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    ephemeral_ttl: Duration,
}

impl TokenAuthority {
    /// Create a token authority from configuration
    #[must_use]
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl: Duration::seconds(i64::try_from(config.access_ttl_secs).unwrap_or(900)),
            refresh_ttl: Duration::seconds(
                i64::try_from(config.refresh_ttl_secs).unwrap_or(604_800),
            ),
            ephemeral_ttl: Duration::seconds(
                i64::try_from(config.ephemeral_ttl_secs).unwrap_or(600),
            ),
        }
    }

    /// Mint an access + refresh token pair for a user
    ///
    /// # Errors
    ///
    /// Returns an error if JWT encoding fails.
    pub fn create_token_pair(&self, user: &User) -> Result<TokenPair, AppError> {
        let now = Utc::now();
        let access_uuid = Uuid::new_v4();
        let refresh_uuid = Uuid::new_v4();
        let access_expires_at = now + self.access_ttl;
        let refresh_expires_at = now + self.refresh_ttl;

        let access_claims = AccessClaims {
            sub: user.id,
            jti: access_uuid,
            adm: user.is_admin(),
            act: user.is_active(),
            iat: now.timestamp(),
            exp: access_expires_at.timestamp(),
        };
        let refresh_claims = RefreshClaims {
            sub: user.id,
            jti: refresh_uuid,
            iat: now.timestamp(),
            exp: refresh_expires_at.timestamp(),
        };

        let header = Header::new(Algorithm::HS256);
        let access_token = encode(&header, &access_claims, &self.access_encoding)
            .map_err(|e| AppError::internal(format!("failed to sign access token: {e}")))?;
        let refresh_token = encode(&header, &refresh_claims, &self.refresh_encoding)
            .map_err(|e| AppError::internal(format!("failed to sign refresh token: {e}")))?;

        Ok(TokenPair {
            user_id: user.id,
            access_token,
            refresh_token,
            access_uuid,
            refresh_uuid,
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// Mint a magic-link or email-verification token
    ///
    /// # Errors
    ///
    /// Returns an error if JWT encoding fails.
    pub fn create_ephemeral_token(
        &self,
        user: &User,
        kind: EphemeralKind,
    ) -> Result<EphemeralToken, AppError> {
        let now = Utc::now();
        let uuid = Uuid::new_v4();
        let expires_at = now + self.ephemeral_ttl;

        let claims = EphemeralClaims {
            sub: user.id,
            jti: uuid,
            knd: kind.claim_value().to_owned(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.access_encoding,
        )
        .map_err(|e| AppError::internal(format!("failed to sign ephemeral token: {e}")))?;

        Ok(EphemeralToken {
            token,
            uuid,
            ttl: self
                .ephemeral_ttl
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(600)),
        })
    }

    /// Parse and validate an access token string
    ///
    /// # Errors
    ///
    /// Returns a [`TokenValidationError`] on bad signature, expiry, or
    /// malformed input.
    pub fn parse_access_string(
        &self,
        token: &str,
    ) -> Result<AccessDescriptor, TokenValidationError> {
        let claims: AccessClaims = decode_claims(token, &self.access_decoding)?;
        Ok(AccessDescriptor {
            access_uuid: claims.jti,
            user_id: claims.sub,
            is_admin: claims.adm,
            is_authorised: claims.act,
            expires_at: timestamp_to_datetime(claims.exp),
        })
    }

    /// Parse and validate a refresh token string
    ///
    /// # Errors
    ///
    /// Returns a [`TokenValidationError`] on bad signature, expiry, or
    /// malformed input.
    pub fn parse_refresh_string(
        &self,
        token: &str,
    ) -> Result<RefreshDescriptor, TokenValidationError> {
        let claims: RefreshClaims = decode_claims(token, &self.refresh_decoding)?;
        Ok(RefreshDescriptor {
            refresh_uuid: claims.jti,
            user_id: claims.sub,
            expires_at: timestamp_to_datetime(claims.exp),
        })
    }

    /// Parse and validate an ephemeral token string of the expected kind
    ///
    /// # Errors
    ///
    /// Returns a [`TokenValidationError`] on bad signature, expiry, kind
    /// mismatch, or malformed input.
    pub fn parse_ephemeral_string(
        &self,
        token: &str,
        kind: EphemeralKind,
    ) -> Result<EphemeralDescriptor, TokenValidationError> {
        let claims: EphemeralClaims = decode_claims(token, &self.access_decoding)?;
        if claims.knd != kind.claim_value() {
            return Err(TokenValidationError::TokenInvalid {
                reason: format!("unexpected token kind: {}", claims.knd),
            });
        }
        Ok(EphemeralDescriptor {
            ephemeral_uuid: claims.jti,
            user_id: claims.sub,
            expires_at: timestamp_to_datetime(claims.exp),
        })
    }

    /// Read the `Authorization: Bearer …` header and parse the access token
    ///
    /// # Errors
    ///
    /// Fails with the distinguishable [`TokenValidationError::NoBearer`] when
    /// the header is absent, so the rate-limit gate can decide the anonymous
    /// path.
    pub fn extract_access_metadata(
        &self,
        headers: &axum::http::HeaderMap,
    ) -> Result<AccessDescriptor, TokenValidationError> {
        let token = bearer_from_headers(headers).ok_or(TokenValidationError::NoBearer)?;
        self.parse_access_string(&token)
    }
}

/// Pull the bearer token out of the `Authorization` header, if present
#[must_use]
pub fn bearer_from_headers(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_owned)
}

/// Decode a claims struct, mapping library errors to detailed kinds
fn decode_claims<T: for<'de> Deserialize<'de>>(
    token: &str,
    key: &DecodingKey,
) -> Result<T, TokenValidationError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;

    decode::<T>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| convert_jwt_error(&e))
}

/// Convert JWT library errors to detailed validation errors
fn convert_jwt_error(e: &jsonwebtoken::errors::Error) -> TokenValidationError {
    use jsonwebtoken::errors::ErrorKind;

    match e.kind() {
        ErrorKind::ExpiredSignature => {
            tracing::debug!("token rejected: expired");
            TokenValidationError::TokenExpired {
                expired_at: Utc::now(),
            }
        }
        ErrorKind::InvalidSignature => {
            tracing::warn!("token signature verification failed");
            TokenValidationError::TokenInvalid {
                reason: "signature verification failed".into(),
            }
        }
        ErrorKind::InvalidToken => TokenValidationError::TokenMalformed {
            details: "token format is invalid".into(),
        },
        ErrorKind::Base64(base64_err) => TokenValidationError::TokenMalformed {
            details: format!("token contains invalid base64: {base64_err}"),
        },
        ErrorKind::Json(json_err) => TokenValidationError::TokenMalformed {
            details: format!("token contains invalid JSON: {json_err}"),
        },
        _ => TokenValidationError::TokenInvalid {
            reason: format!("token validation failed: {e}"),
        },
    }
}

fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
}
