// ABOUTME: Store factory for environment-based backend selection
// ABOUTME: Wraps the in-memory and Redis backends behind one front type
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

use super::memory::MemoryStore;
use super::redis::RedisStore;
use super::{EphemeralStore, StoreConfig};
use crate::auth::TokenPair;
use crate::errors::AppResult;
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone)]
enum Backend {
    Memory(MemoryStore),
    Redis(RedisStore),
}

/// Unified ephemeral store interface
///
/// Selects the Redis backend when a URL is configured, the in-memory
/// backend otherwise.
#[derive(Clone)]
pub struct SessionStore {
    inner: Backend,
}

impl SessionStore {
    /// Create a store instance based on configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis backend fails to connect.
    pub async fn new(config: StoreConfig) -> AppResult<Self> {
        let inner = if config.redis_url.is_some() {
            tracing::info!("initializing Redis ephemeral store");
            Backend::Redis(RedisStore::connect(&config).await?)
        } else {
            tracing::info!(
                "initializing in-memory ephemeral store (max entries: {})",
                config.max_entries
            );
            Backend::Memory(MemoryStore::new(&config))
        };
        Ok(Self { inner })
    }

    /// In-memory store for tests and single-instance deployments
    #[must_use]
    pub fn in_memory(config: &StoreConfig) -> Self {
        Self {
            inner: Backend::Memory(MemoryStore::new(config)),
        }
    }

    /// Store both UUIDs of a token pair; see [`EphemeralStore::create_auth`]
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    pub async fn create_auth(&self, pair: &TokenPair) -> AppResult<()> {
        match &self.inner {
            Backend::Memory(s) => s.create_auth(pair).await,
            Backend::Redis(s) => s.create_auth(pair).await,
        }
    }

    /// Store a single ephemeral-token entry
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    pub async fn store_token(
        &self,
        user_id: Uuid,
        token_uuid: Uuid,
        ttl: Duration,
    ) -> AppResult<()> {
        match &self.inner {
            Backend::Memory(s) => s.store_token(user_id, token_uuid, ttl).await,
            Backend::Redis(s) => s.store_token(user_id, token_uuid, ttl).await,
        }
    }

    /// Fetch the stored user ID; `None` means revoked or unknown
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub async fn fetch_auth(&self, user_id: Uuid, token_uuid: Uuid) -> AppResult<Option<Uuid>> {
        match &self.inner {
            Backend::Memory(s) => s.fetch_auth(user_id, token_uuid).await,
            Backend::Redis(s) => s.fetch_auth(user_id, token_uuid).await,
        }
    }

    /// Delete one entry by combined key, returning the number removed
    ///
    /// # Errors
    ///
    /// Returns an error if the backend delete fails.
    pub async fn delete_auth(&self, key: &str) -> AppResult<u64> {
        match &self.inner {
            Backend::Memory(s) => s.delete_auth(key).await,
            Backend::Redis(s) => s.delete_auth(key).await,
        }
    }

    /// Delete every entry of a user except the listed combined keys
    ///
    /// # Errors
    ///
    /// Returns an error if the backend scan or delete fails.
    pub async fn delete_all_tokens_except(
        &self,
        user_id: Uuid,
        exempt_keys: &[String],
    ) -> AppResult<u64> {
        match &self.inner {
            Backend::Memory(s) => s.delete_all_tokens_except(user_id, exempt_keys).await,
            Backend::Redis(s) => s.delete_all_tokens_except(user_id, exempt_keys).await,
        }
    }

    /// Increment the sliding-window request counter for a client IP
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub async fn add_request_count_entry(&self, client_ip: &str) -> AppResult<u64> {
        match &self.inner {
            Backend::Memory(s) => s.add_request_count_entry(client_ip).await,
            Backend::Redis(s) => s.add_request_count_entry(client_ip).await,
        }
    }

    /// Verify the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unhealthy.
    pub async fn health_check(&self) -> AppResult<()> {
        match &self.inner {
            Backend::Memory(s) => s.health_check().await,
            Backend::Redis(s) => s.health_check().await,
        }
    }

    /// Name of the active backend, for health reporting
    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match &self.inner {
            Backend::Memory(_) => "memory",
            Backend::Redis(_) => "redis",
        }
    }
}
