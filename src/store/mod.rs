// ABOUTME: Ephemeral store abstraction recording which token UUIDs are live
// ABOUTME: Pluggable backends (in-memory, Redis) plus rate-limit counters
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

//! # Ephemeral Store
//!
//! The revocation and rate-limit cache. Every issued access and refresh
//! token UUID is stored under the combined key `"<user_id>::<uuid>"` with
//! the token's remaining lifetime as TTL. Deletion is the authoritative
//! revocation mechanism; entries also expire autonomously.

/// Unified store front choosing a backend
pub mod factory;
/// In-memory backend
pub mod memory;
/// Redis backend
pub mod redis;

pub use factory::SessionStore;

use crate::auth::TokenPair;
use crate::constants::store;
use crate::errors::AppResult;
use std::time::Duration;
use uuid::Uuid;

/// Build the combined `"<user_id>::<uuid>"` store key
#[must_use]
pub fn combined_key(user_id: Uuid, token_uuid: Uuid) -> String {
    format!("{user_id}{}{token_uuid}", store::COMBINED_KEY_SEPARATOR)
}

/// Pattern matching every session entry of a user
#[must_use]
pub fn user_pattern(user_id: Uuid) -> String {
    format!("{user_id}{}*", store::COMBINED_KEY_SEPARATOR)
}

/// Key for a client's rate-limit counter
#[must_use]
pub fn rate_limit_key(client_ip: &str) -> String {
    format!("{}{client_ip}", store::RATE_LIMIT_KEY_PREFIX)
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis connection URL; in-memory backend when unset
    pub redis_url: Option<String>,
    /// Maximum number of entries (in-memory backend)
    pub max_entries: usize,
    /// Sweep interval for expired entries (in-memory backend)
    pub cleanup_interval: Duration,
    /// Background sweep task; disable in tests to avoid runtime conflicts
    pub enable_background_cleanup: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            max_entries: store::DEFAULT_MAX_ENTRIES,
            cleanup_interval: Duration::from_secs(store::DEFAULT_CLEANUP_INTERVAL_SECS),
            enable_background_cleanup: true,
        }
    }
}

/// Backend contract for the ephemeral store
///
/// All operations are safe under concurrent request load; a single entry's
/// deletion followed by a fetch is linearisable, and `create_auth` is
/// visible to any `fetch_auth` that starts after it returns.
#[async_trait::async_trait]
pub trait EphemeralStore: Send + Sync + Clone {
    /// Store both the access and refresh UUIDs of a pair with their TTLs.
    /// Failure of either entry is a failure of the whole operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    async fn create_auth(&self, pair: &TokenPair) -> AppResult<()>;

    /// Store a single ephemeral-token entry
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    async fn store_token(&self, user_id: Uuid, token_uuid: Uuid, ttl: Duration) -> AppResult<()>;

    /// Fetch the stored user ID for a token; `None` means revoked or unknown
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    async fn fetch_auth(&self, user_id: Uuid, token_uuid: Uuid) -> AppResult<Option<Uuid>>;

    /// Delete one entry by combined key, returning the number removed (0 or 1)
    ///
    /// # Errors
    ///
    /// Returns an error if the backend delete fails.
    async fn delete_auth(&self, key: &str) -> AppResult<u64>;

    /// Delete every entry of a user except the listed combined keys
    ///
    /// # Errors
    ///
    /// Returns an error if the backend scan or delete fails.
    async fn delete_all_tokens_except(
        &self,
        user_id: Uuid,
        exempt_keys: &[String],
    ) -> AppResult<u64>;

    /// Increment the sliding-window request counter for a client IP,
    /// returning the count within the current window
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    async fn add_request_count_entry(&self, client_ip: &str) -> AppResult<u64>;

    /// Verify the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unhealthy.
    async fn health_check(&self) -> AppResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_key_layout() {
        let user_id = Uuid::new_v4();
        let token_uuid = Uuid::new_v4();
        let key = combined_key(user_id, token_uuid);
        assert_eq!(key, format!("{user_id}::{token_uuid}"));
        assert!(key.starts_with(&user_id.to_string()));
    }

    #[test]
    fn test_user_pattern_matches_combined_keys() {
        let user_id = Uuid::new_v4();
        let key = combined_key(user_id, Uuid::new_v4());
        let pattern = glob::Pattern::new(&user_pattern(user_id)).unwrap();
        assert!(pattern.matches(&key));
        assert!(!pattern.matches(&combined_key(Uuid::new_v4(), Uuid::new_v4())));
    }
}
