// ABOUTME: Shared server resources wired once at startup
// ABOUTME: Configuration, access manager, auth gateway, and cookie names
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AMS Works

use std::sync::Arc;

use crate::access::AccessManager;
use crate::config::environment::ServerConfig;
use crate::middleware::AuthGateway;
use crate::security::cookies::CookieNames;
use crate::services::{ApiTokenService, UserService};

/// Everything the HTTP layer needs, assembled once and shared via `Arc`
pub struct ServerResources {
    pub config: ServerConfig,
    pub access: AccessManager,
    pub gateway: AuthGateway,
    pub cookie_names: CookieNames,
}

impl ServerResources {
    /// Wire the shared resources from an assembled access manager
    #[must_use]
    pub fn new(
        config: ServerConfig,
        access: AccessManager,
        users: Arc<dyn UserService>,
        api_tokens: Arc<dyn ApiTokenService>,
    ) -> Self {
        let cookie_names = CookieNames::new(&config.cookies);
        let gateway = AuthGateway::new(
            access.authority(),
            access.store(),
            users,
            api_tokens,
            cookie_names.clone(),
        );
        Self {
            config,
            access,
            gateway,
            cookie_names,
        }
    }
}
