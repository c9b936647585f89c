// ABOUTME: Access manager orchestrating identity, session, and token flows
// ABOUTME: Composes the token authority, ephemeral store, and collaborators
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

//! # Access Manager
//!
//! The orchestration core: signup and email verification, passwordless
//! login, refresh rotation, logout variants, the OAuth callback protocol,
//! and the API-token lifecycle. Each flow composes the token authority, the
//! ephemeral store, and the externally owned collaborator services.

/// API-token lifecycle and role-threshold enforcement
pub mod api_tokens;
/// Magic-link login, refresh, and logout flows
pub mod login;
/// Signup and email verification
pub mod signup;
/// OAuth callback protocol
pub mod sso;

pub use sso::SsoLogin;

use std::sync::Arc;

use crate::auth::{TokenAuthority, TokenPair};
use crate::errors::AppResult;
use crate::models::User;
use crate::oauth::AdapterRegistry;
use crate::services::{AuditEvent, AuditLog, ApiTokenService, BillingHook, EmailManager, UserService};
use crate::store::SessionStore;

/// Orchestrator for every identity flow
///
/// Cheap to clone; all members are shared handles.
#[derive(Clone)]
pub struct AccessManager {
    pub(crate) authority: Arc<TokenAuthority>,
    pub(crate) store: SessionStore,
    pub(crate) users: Arc<dyn UserService>,
    pub(crate) api_tokens: Arc<dyn ApiTokenService>,
    pub(crate) email: Arc<dyn EmailManager>,
    pub(crate) audit: Arc<dyn AuditLog>,
    pub(crate) billing: Option<Arc<dyn BillingHook>>,
    pub(crate) oauth: Arc<AdapterRegistry>,
}

impl AccessManager {
    /// Assemble the access manager from its collaborators
    #[must_use]
    pub fn new(
        authority: Arc<TokenAuthority>,
        store: SessionStore,
        users: Arc<dyn UserService>,
        api_tokens: Arc<dyn ApiTokenService>,
        email: Arc<dyn EmailManager>,
        audit: Arc<dyn AuditLog>,
        oauth: Arc<AdapterRegistry>,
    ) -> Self {
        Self {
            authority,
            store,
            users,
            api_tokens,
            email,
            audit,
            billing: None,
            oauth,
        }
    }

    /// Attach the optional billing collaborator
    #[must_use]
    pub fn with_billing(mut self, billing: Arc<dyn BillingHook>) -> Self {
        self.billing = Some(billing);
        self
    }

    /// Token authority handle, shared with the middleware gateway
    #[must_use]
    pub fn authority(&self) -> Arc<TokenAuthority> {
        self.authority.clone()
    }

    /// Ephemeral store handle, shared with the middleware gateway
    #[must_use]
    pub fn store(&self) -> SessionStore {
        self.store.clone()
    }

    /// OAuth adapter registry handle
    #[must_use]
    pub fn oauth(&self) -> Arc<AdapterRegistry> {
        self.oauth.clone()
    }

    /// Mint a token pair and persist both UUIDs in the ephemeral store
    ///
    /// A store failure after minting is fatal to the request; the user
    /// record is already saved and the client simply retries login.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or the store write fails.
    pub async fn issue_session(&self, user: &User) -> AppResult<TokenPair> {
        let pair = self.authority.create_token_pair(user)?;
        self.store.create_auth(&pair).await?;
        Ok(pair)
    }

    /// Record an audit event; failures are logged and discarded
    pub(crate) async fn audit_best_effort(&self, event: AuditEvent, user_id: uuid::Uuid) {
        if let Err(e) = self.audit.record(event, user_id).await {
            tracing::warn!("audit record failed for {:?}: {}", event, e);
        }
    }
}
