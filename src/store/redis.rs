// ABOUTME: Redis ephemeral store with connection pooling and TTL support
// ABOUTME: Provides a shared revocation store for multi-instance deployments
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

use super::{combined_key, rate_limit_key, user_pattern, EphemeralStore, StoreConfig};
use crate::auth::TokenPair;
use crate::constants::store as store_constants;
use crate::errors::{AppError, AppResult};
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Namespace prefix so the service is safe on a shared Redis instance
const KEY_PREFIX: &str = "ams:";

/// Connection retry bounds for the initial connect
const INITIAL_CONNECTION_RETRIES: u32 = 3;
const INITIAL_RETRY_DELAY_MS: u64 = 250;
const MAX_RETRY_DELAY_MS: u64 = 4_000;

/// Redis-backed ephemeral store
///
/// Uses `ConnectionManager` for automatic reconnection. Session entries rely
/// on Redis TTL expiry; bulk invalidation walks a cursor-based `SCAN MATCH`.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis with retry and exponential backoff
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can be established within the retry
    /// budget.
    pub async fn connect(config: &StoreConfig) -> AppResult<Self> {
        let redis_url = config
            .redis_url
            .as_ref()
            .ok_or_else(|| AppError::internal("Redis URL is required for the Redis backend"))?;

        info!("connecting to Redis ephemeral store at {redis_url}");

        let client = redis::Client::open(redis_url.as_str())
            .map_err(|e| AppError::internal(format!("failed to create Redis client: {e}")))?;

        let mut last_error = None;
        let mut delay_ms = INITIAL_RETRY_DELAY_MS;

        for attempt in 0..=INITIAL_CONNECTION_RETRIES {
            match ConnectionManager::new(client.clone()).await {
                Ok(manager) => {
                    if attempt > 0 {
                        info!("Redis connection established after {attempt} retries");
                    }
                    return Ok(Self { manager });
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < INITIAL_CONNECTION_RETRIES {
                        warn!(
                            "Redis connection attempt {}/{} failed, retrying in {}ms",
                            attempt + 1,
                            INITIAL_CONNECTION_RETRIES + 1,
                            delay_ms
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = (delay_ms * 2).min(MAX_RETRY_DELAY_MS);
                    }
                }
            }
        }

        Err(AppError::internal(format!(
            "failed to connect to Redis after {} attempts: {}",
            INITIAL_CONNECTION_RETRIES + 1,
            last_error.map_or_else(|| "unknown error".to_owned(), |e| e.to_string())
        )))
    }

    fn build_key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }
}

#[async_trait::async_trait]
impl EphemeralStore for RedisStore {
    async fn create_auth(&self, pair: &TokenPair) -> AppResult<()> {
        let now = Utc::now();
        let access_ttl = (pair.access_expires_at - now).num_seconds().max(1) as u64;
        let refresh_ttl = (pair.refresh_expires_at - now).num_seconds().max(1) as u64;

        let access_key = Self::build_key(&combined_key(pair.user_id, pair.access_uuid));
        let refresh_key = Self::build_key(&combined_key(pair.user_id, pair.refresh_uuid));

        let mut conn = self.manager.clone();

        // MULTI/EXEC so both entries land or neither does.
        redis::pipe()
            .atomic()
            .set_ex(&access_key, pair.user_id.to_string(), access_ttl)
            .set_ex(&refresh_key, pair.user_id.to_string(), refresh_ttl)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| {
                error!("Redis create_auth pipeline failed: {e}");
                AppError::internal(format!("store error: {e}"))
            })?;

        Ok(())
    }

    async fn store_token(&self, user_id: Uuid, token_uuid: Uuid, ttl: Duration) -> AppResult<()> {
        let key = Self::build_key(&combined_key(user_id, token_uuid));
        let mut conn = self.manager.clone();

        conn.set_ex::<_, _, ()>(&key, user_id.to_string(), ttl.as_secs().max(1))
            .await
            .map_err(|e| {
                error!("Redis SET operation failed: {e}");
                AppError::internal(format!("store error: {e}"))
            })?;

        Ok(())
    }

    async fn fetch_auth(&self, user_id: Uuid, token_uuid: Uuid) -> AppResult<Option<Uuid>> {
        let key = Self::build_key(&combined_key(user_id, token_uuid));
        let mut conn = self.manager.clone();

        let stored: Option<String> = conn.get(&key).await.map_err(|e| {
            error!("Redis GET operation failed: {e}");
            AppError::internal(format!("store error: {e}"))
        })?;

        match stored {
            Some(raw) => Uuid::parse_str(&raw)
                .map(Some)
                .map_err(|e| AppError::internal(format!("corrupt store entry: {e}"))),
            None => Ok(None),
        }
    }

    async fn delete_auth(&self, key: &str) -> AppResult<u64> {
        let redis_key = Self::build_key(key);
        let mut conn = self.manager.clone();

        let removed: u64 = conn.del(&redis_key).await.map_err(|e| {
            error!("Redis DEL operation failed: {e}");
            AppError::internal(format!("store error: {e}"))
        })?;

        Ok(removed)
    }

    async fn delete_all_tokens_except(
        &self,
        user_id: Uuid,
        exempt_keys: &[String],
    ) -> AppResult<u64> {
        let pattern = format!("{KEY_PREFIX}{}", user_pattern(user_id));
        let exempt: Vec<String> = exempt_keys.iter().map(|k| Self::build_key(k)).collect();

        let mut conn = self.manager.clone();
        let mut removed = 0u64;
        let mut cursor = 0u64;

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| {
                    error!("Redis SCAN failed: {e}");
                    AppError::internal(format!("store error: {e}"))
                })?;

            let doomed: Vec<String> = keys.into_iter().filter(|k| !exempt.contains(k)).collect();
            if !doomed.is_empty() {
                let deleted: u64 = conn.del(&doomed).await.map_err(|e| {
                    error!("Redis DEL failed: {e}");
                    AppError::internal(format!("store error: {e}"))
                })?;
                removed += deleted;
            }

            cursor = new_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(removed)
    }

    async fn add_request_count_entry(&self, client_ip: &str) -> AppResult<u64> {
        let key = Self::build_key(&rate_limit_key(client_ip));
        let mut conn = self.manager.clone();

        let count: u64 = conn.incr(&key, 1u64).await.map_err(|e| {
            error!("Redis INCR operation failed: {e}");
            AppError::internal(format!("store error: {e}"))
        })?;

        // First hit in a window sets the window length.
        if count == 1 {
            let _: bool = conn
                .expire(&key, store_constants::RATE_LIMIT_WINDOW_SECS as i64)
                .await
                .map_err(|e| {
                    error!("Redis EXPIRE operation failed: {e}");
                    AppError::internal(format!("store error: {e}"))
                })?;
        }

        Ok(count)
    }

    async fn health_check(&self) -> AppResult<()> {
        let mut conn = self.manager.clone();

        let response: String = redis::cmd("PING").query_async(&mut conn).await.map_err(|e| {
            error!("Redis PING failed: {e}");
            AppError::internal(format!("store error: {e}"))
        })?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(AppError::internal(format!(
                "unexpected PING response '{response}'"
            )))
        }
    }
}
