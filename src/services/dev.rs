// ABOUTME: In-memory collaborator backends for development and tests
// ABOUTME: User map, API token vec, recording outbox, and tracing audit log
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

//! In-memory development backends.
//!
//! These back the server binary when no real stores are wired, and give
//! integration tests a harness with full visibility: the email manager
//! keeps an inspectable outbox, the audit log records every event.

use super::{ApiTokenService, AuditEvent, AuditLog, BillingHook, EmailManager, UserService};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{ApiToken, ApiTokenStatus, User};
use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Prefix of every generated API token secret
const API_TOKEN_PREFIX: &str = "amk_";

fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// In-memory user store
#[derive(Default)]
pub struct InMemoryUserService {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a prepared user record, for tests
    pub fn insert(&self, user: User) {
        if let Ok(mut users) = self.users.lock() {
            users.insert(user.id, user);
        }
    }
}

#[async_trait::async_trait]
impl UserService for InMemoryUserService {
    async fn create_user(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> AppResult<User> {
        let user = User::new(first_name, last_name, email);
        let mut users = self
            .users
            .lock()
            .map_err(|_| AppError::internal("user store lock poisoned"))?;
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::new(
                ErrorCode::InvalidUserEmail,
                format!("email already registered: {}", user.email),
            ));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let users = self
            .users
            .lock()
            .map_err(|_| AppError::internal("user store lock poisoned"))?;
        Ok(users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let needle = email.trim().to_lowercase();
        let users = self
            .users
            .lock()
            .map_err(|_| AppError::internal("user store lock poisoned"))?;
        Ok(users.values().find(|u| u.email == needle).cloned())
    }

    async fn save_user(&self, user: &User) -> AppResult<()> {
        let mut users = self
            .users
            .lock()
            .map_err(|_| AppError::internal("user store lock poisoned"))?;
        users.insert(user.id, user.clone());
        Ok(())
    }
}

/// In-memory API token store
#[derive(Default)]
pub struct InMemoryApiTokenService {
    tokens: Mutex<Vec<ApiToken>>,
}

impl InMemoryApiTokenService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tokens<T>(&self, f: impl FnOnce(&mut Vec<ApiToken>) -> T) -> AppResult<T> {
        let mut tokens = self
            .tokens
            .lock()
            .map_err(|_| AppError::internal("token store lock poisoned"))?;
        Ok(f(&mut tokens))
    }
}

#[async_trait::async_trait]
impl ApiTokenService for InMemoryApiTokenService {
    async fn create_token(&self, user: &User, ttl_seconds: u64) -> AppResult<(ApiToken, String)> {
        let random: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let secret = format!("{API_TOKEN_PREFIX}{random}");

        let token = ApiToken {
            id: Uuid::new_v4(),
            owner_user_id: user.id,
            owner_nano_id: user.nano_id.clone(),
            encoded_secret: hash_secret(&secret),
            status: ApiTokenStatus::Active,
            ttl_seconds,
            last_used_at: None,
            created_at: Utc::now(),
        };

        self.with_tokens(|tokens| tokens.push(token.clone()))?;
        Ok((token, secret))
    }

    async fn tokens_for_user(
        &self,
        user_id: Uuid,
        page: u32,
        per_page: u32,
    ) -> AppResult<Vec<ApiToken>> {
        let skip = (page.saturating_sub(1) as usize) * per_page as usize;
        self.with_tokens(|tokens| {
            tokens
                .iter()
                .filter(|t| t.owner_user_id == user_id)
                .skip(skip)
                .take(per_page as usize)
                .cloned()
                .collect()
        })
    }

    async fn activate_token(&self, token_id: Uuid) -> AppResult<()> {
        self.with_tokens(|tokens| {
            tokens
                .iter_mut()
                .find(|t| t.id == token_id)
                .map(|t| t.status = ApiTokenStatus::Active)
                .ok_or_else(|| AppError::from_code(ErrorCode::InvalidApiTokenId))
        })?
    }

    async fn revoke_token(&self, token_id: Uuid) -> AppResult<()> {
        self.with_tokens(|tokens| {
            tokens
                .iter_mut()
                .find(|t| t.id == token_id)
                .map(|t| t.status = ApiTokenStatus::Revoked)
                .ok_or_else(|| AppError::from_code(ErrorCode::InvalidApiTokenId))
        })?
    }

    async fn delete_token(&self, token_id: Uuid) -> AppResult<()> {
        self.with_tokens(|tokens| {
            let before = tokens.len();
            tokens.retain(|t| t.id != token_id);
            if tokens.len() == before {
                Err(AppError::from_code(ErrorCode::InvalidApiTokenId))
            } else {
                Ok(())
            }
        })?
    }

    async fn validate_secret(&self, presented: &str) -> AppResult<Option<ApiToken>> {
        let encoded = hash_secret(presented);
        let now = Utc::now();
        self.with_tokens(|tokens| {
            tokens
                .iter()
                .find(|t| {
                    t.encoded_secret == encoded
                        && t.status == ApiTokenStatus::Active
                        && (t.is_permanent()
                            || t.created_at + Duration::seconds(t.ttl_seconds as i64) > now)
                })
                .cloned()
        })
    }

    async fn touch_last_used(&self, token_id: Uuid) -> AppResult<()> {
        self.with_tokens(|tokens| {
            if let Some(token) = tokens.iter_mut().find(|t| t.id == token_id) {
                token.last_used_at = Some(Utc::now());
            }
        })
    }
}

/// Which template an outbound message used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundEmailKind {
    Verification,
    Login,
}

/// One captured outbound email
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub kind: OutboundEmailKind,
    pub to: String,
    pub token: String,
}

/// Email manager that records every send into an inspectable outbox
///
/// Doubles as the development backend: each message is also logged so the
/// magic link can be followed from the server logs.
#[derive(Default)]
pub struct OutboxEmailManager {
    outbox: Mutex<Vec<OutboundEmail>>,
}

impl OutboxEmailManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every captured message, oldest first
    #[must_use]
    pub fn outbox(&self) -> Vec<OutboundEmail> {
        self.outbox.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// Token of the most recent message, if any
    #[must_use]
    pub fn last_token(&self) -> Option<String> {
        self.outbox
            .lock()
            .ok()
            .and_then(|o| o.last().map(|m| m.token.clone()))
    }

    fn push(&self, message: OutboundEmail) -> AppResult<()> {
        info!(
            "outbound {:?} email to {} (token elided)",
            message.kind, message.to
        );
        self.outbox
            .lock()
            .map_err(|_| AppError::internal("outbox lock poisoned"))?
            .push(message);
        Ok(())
    }
}

#[async_trait::async_trait]
impl EmailManager for OutboxEmailManager {
    async fn send_verification_email(&self, user: &User, token: &str) -> AppResult<()> {
        self.push(OutboundEmail {
            kind: OutboundEmailKind::Verification,
            to: user.email.clone(),
            token: token.to_owned(),
        })
    }

    async fn send_login_email(&self, user: &User, token: &str) -> AppResult<()> {
        self.push(OutboundEmail {
            kind: OutboundEmailKind::Login,
            to: user.email.clone(),
            token: token.to_owned(),
        })
    }
}

/// Audit log that records events in memory and mirrors them to tracing
#[derive(Default)]
pub struct RecordingAuditLog {
    events: Mutex<Vec<(AuditEvent, Uuid)>>,
}

impl RecordingAuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded event, oldest first
    #[must_use]
    pub fn events(&self) -> Vec<(AuditEvent, Uuid)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl AuditLog for RecordingAuditLog {
    async fn record(&self, event: AuditEvent, user_id: Uuid) -> AppResult<()> {
        info!("audit: {:?} for user {}", event, user_id);
        self.events
            .lock()
            .map_err(|_| AppError::internal("audit lock poisoned"))?
            .push((event, user_id));
        Ok(())
    }
}

/// Billing hook that records linked emails
#[derive(Default)]
pub struct RecordingBillingHook {
    linked: Mutex<Vec<String>>,
}

impl RecordingBillingHook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emails that were offered for linkage
    #[must_use]
    pub fn linked(&self) -> Vec<String> {
        self.linked.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl BillingHook for RecordingBillingHook {
    async fn link_unassociated(&self, email: &str) -> AppResult<()> {
        self.linked
            .lock()
            .map_err(|_| AppError::internal("billing lock poisoned"))?
            .push(email.to_owned());
        Ok(())
    }
}
