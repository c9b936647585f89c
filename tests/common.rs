// ABOUTME: Shared test harness wiring the core against in-memory backends
// ABOUTME: Builds an access manager, gateway, and router with full visibility
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AMS Works

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ams_server::access::AccessManager;
use ams_server::auth::TokenAuthority;
use ams_server::config::environment::ServerConfig;
use ams_server::models::{User, UserStatus};
use ams_server::oauth::{AdapterRegistry, OAuthAdapter, OAuthError, ProviderUserData};
use ams_server::resources::ServerResources;
use ams_server::services::dev::{
    InMemoryApiTokenService, InMemoryUserService, OutboxEmailManager, RecordingAuditLog,
};
use ams_server::services::UserService;
use ams_server::store::{SessionStore, StoreConfig};

/// Everything a test needs to drive the core and observe its effects
pub struct Harness {
    pub resources: Arc<ServerResources>,
    pub access: AccessManager,
    pub authority: Arc<TokenAuthority>,
    pub store: SessionStore,
    pub users: Arc<InMemoryUserService>,
    pub api_tokens: Arc<InMemoryApiTokenService>,
    pub email: Arc<OutboxEmailManager>,
    pub audit: Arc<RecordingAuditLog>,
}

/// Build a harness with an empty adapter registry
pub fn harness() -> Harness {
    harness_with_registry(AdapterRegistry::new())
}

/// Build a harness with the given OAuth adapters registered
pub fn harness_with_registry(registry: AdapterRegistry) -> Harness {
    let config = ServerConfig::default();
    let authority = Arc::new(TokenAuthority::new(&config.tokens));
    let store = SessionStore::in_memory(&StoreConfig {
        enable_background_cleanup: false,
        ..StoreConfig::default()
    });
    let users = Arc::new(InMemoryUserService::new());
    let api_tokens = Arc::new(InMemoryApiTokenService::new());
    let email = Arc::new(OutboxEmailManager::new());
    let audit = Arc::new(RecordingAuditLog::new());

    let access = AccessManager::new(
        authority.clone(),
        store.clone(),
        users.clone(),
        api_tokens.clone(),
        email.clone(),
        audit.clone(),
        Arc::new(registry),
    );

    let resources = Arc::new(ServerResources::new(
        config,
        access.clone(),
        users.clone(),
        api_tokens.clone(),
    ));

    Harness {
        resources,
        access,
        authority,
        store,
        users,
        api_tokens,
        email,
        audit,
    }
}

impl Harness {
    /// Create an ACTIVE user directly through the user service
    pub async fn active_user(&self, email: &str) -> User {
        let mut user = self
            .users
            .create_user("Test", "User", email)
            .await
            .expect("create user");
        user.transition_to(UserStatus::Active).expect("activate");
        user.mark_email_verified();
        self.users.save_user(&user).await.expect("save user");
        user
    }

    /// Create a PROVISIONED user directly through the user service
    pub async fn provisioned_user(&self, email: &str) -> User {
        self.users
            .create_user("Test", "User", email)
            .await
            .expect("create user")
    }
}

/// Fake OAuth adapter with canned identity data
pub struct FakeProvider {
    pub provider_name: String,
    pub data: ProviderUserData,
}

impl FakeProvider {
    pub fn new(name: &str, email: &str, verified: bool) -> Self {
        Self {
            provider_name: name.to_owned(),
            data: ProviderUserData {
                email: email.to_owned(),
                first_name: "Grace".to_owned(),
                last_name: "Hopper".to_owned(),
                email_verified: verified,
            },
        }
    }
}

#[async_trait::async_trait]
impl OAuthAdapter for FakeProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn auth_code_url(&self, state: &str) -> String {
        format!("https://sso.example.com/auth?state={state}")
    }

    async fn user_data(
        &self,
        query: &HashMap<String, String>,
    ) -> Result<ProviderUserData, OAuthError> {
        query.get("code").ok_or(OAuthError::MissingCode)?;
        Ok(self.data.clone())
    }
}

/// Sleep long enough for a short-TTL entry to expire
pub async fn let_expire(ttl: Duration) {
    tokio::time::sleep(ttl + Duration::from_millis(30)).await;
}
