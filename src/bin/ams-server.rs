// ABOUTME: Server binary wiring configuration, stores, and the HTTP router
// ABOUTME: Ships with in-memory development backends for the external stores
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # AMS Server Binary
//!
//! Starts the access management service. User and API-token persistence is
//! externally owned; this binary wires the in-memory development backends,
//! which is enough for local development and demos. Production deployments
//! embed the library and provide their own collaborator implementations.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use ams_server::access::AccessManager;
use ams_server::auth::TokenAuthority;
use ams_server::config::environment::ServerConfig;
use ams_server::logging;
use ams_server::oauth::providers::{GithubAdapter, GoogleAdapter};
use ams_server::oauth::AdapterRegistry;
use ams_server::resources::ServerResources;
use ams_server::routes;
use ams_server::services::dev::{
    InMemoryApiTokenService, InMemoryUserService, OutboxEmailManager, RecordingAuditLog,
    RecordingBillingHook,
};
use ams_server::store::{SessionStore, StoreConfig};

#[derive(Parser)]
#[command(name = "ams-server")]
#[command(about = "Access Management Service - passwordless identity and session backend")]
struct Args {
    /// Override the HTTP listen port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.http_port {
        config.http_port = port;
    }

    logging::init_from_env()?;
    info!("starting ams-server: {}", config.summary());

    let store = SessionStore::new(StoreConfig {
        redis_url: config.redis_url.clone(),
        ..StoreConfig::default()
    })
    .await
    .map_err(|e| anyhow::anyhow!("store initialization failed: {e}"))?;

    let mut registry = AdapterRegistry::new();
    if let Some(google) = &config.oauth.google {
        registry.register(Box::new(GoogleAdapter::new(google)));
    }
    if let Some(github) = &config.oauth.github {
        registry.register(Box::new(GithubAdapter::new(github)));
    }

    let users = Arc::new(InMemoryUserService::new());
    let api_tokens = Arc::new(InMemoryApiTokenService::new());
    let authority = Arc::new(TokenAuthority::new(&config.tokens));

    let access = AccessManager::new(
        authority,
        store,
        users.clone(),
        api_tokens.clone(),
        Arc::new(OutboxEmailManager::new()),
        Arc::new(RecordingAuditLog::new()),
        Arc::new(registry),
    )
    .with_billing(Arc::new(RecordingBillingHook::new()));

    let resources = Arc::new(ServerResources::new(config.clone(), access, users, api_tokens));
    let router = routes::router(resources);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install shutdown handler: {e}");
    }
    info!("shutdown signal received");
}
