// ABOUTME: In-memory ephemeral store with LRU eviction and TTL support
// ABOUTME: Includes background cleanup task and per-IP sliding-window counters
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

use super::{combined_key, rate_limit_key, user_pattern, EphemeralStore, StoreConfig};
use crate::auth::TokenPair;
use crate::constants::store as store_constants;
use crate::errors::{AppError, AppResult};
use chrono::Utc;
use dashmap::DashMap;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

/// One live-token entry with its expiry stamp
#[derive(Debug, Clone)]
struct StoreEntry {
    user_id: Uuid,
    expires_at: Instant,
}

impl StoreEntry {
    fn new(user_id: Uuid, ttl: Duration) -> Self {
        Self {
            user_id,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Sliding-window counter state for one client IP
#[derive(Debug, Clone, Copy)]
struct CounterWindow {
    count: u64,
    window_start: Instant,
}

/// In-memory ephemeral store with LRU eviction and background cleanup
///
/// Uses `Arc<RwLock<LruCache>>` shared between store operations and the
/// cleanup task. `LruCache` bounds memory under pathological load; live
/// sessions that fall off the LRU end simply read as revoked, which fails
/// closed.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<LruCache<String, StoreEntry>>>,
    counters: Arc<DashMap<String, CounterWindow>>,
    shutdown_tx: Option<Arc<tokio::sync::mpsc::Sender<()>>>,
}

impl MemoryStore {
    /// Fallback capacity when the config specifies zero entries
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(10_000) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Create a new in-memory store with optional background cleanup task
    #[must_use]
    pub fn new(config: &StoreConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(Self::DEFAULT_CAPACITY);
        let entries = Arc::new(RwLock::new(LruCache::new(capacity)));

        let shutdown_tx = if config.enable_background_cleanup {
            let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
            let entries_clone = entries.clone();
            let cleanup_interval = config.cleanup_interval;

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(cleanup_interval);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            Self::cleanup_expired(&entries_clone).await;
                        }
                        _ = shutdown_rx.recv() => {
                            tracing::debug!("store cleanup task received shutdown signal");
                            break;
                        }
                    }
                }
            });

            Some(Arc::new(shutdown_tx))
        } else {
            None
        };

        Self {
            entries,
            counters: Arc::new(DashMap::new()),
            shutdown_tx,
        }
    }

    /// Remove all expired entries
    async fn cleanup_expired(entries: &Arc<RwLock<LruCache<String, StoreEntry>>>) {
        let mut guard = entries.write().await;

        // Collect first; the cache cannot be mutated while iterating.
        let expired: Vec<String> = guard
            .iter()
            .filter_map(|(k, v)| v.is_expired().then(|| k.clone()))
            .collect();

        for key in &expired {
            guard.pop(key);
        }

        let removed = expired.len();
        drop(guard);
        if removed > 0 {
            tracing::debug!("swept {} expired store entries", removed);
        }
    }
}

#[async_trait::async_trait]
impl EphemeralStore for MemoryStore {
    async fn create_auth(&self, pair: &TokenPair) -> AppResult<()> {
        let now = Utc::now();
        let access_ttl = (pair.access_expires_at - now)
            .to_std()
            .unwrap_or(Duration::ZERO);
        let refresh_ttl = (pair.refresh_expires_at - now)
            .to_std()
            .unwrap_or(Duration::ZERO);

        // Both entries land under one write guard, so a concurrent fetch
        // sees either none or both.
        let mut guard = self.entries.write().await;
        guard.push(
            combined_key(pair.user_id, pair.access_uuid),
            StoreEntry::new(pair.user_id, access_ttl),
        );
        guard.push(
            combined_key(pair.user_id, pair.refresh_uuid),
            StoreEntry::new(pair.user_id, refresh_ttl),
        );
        drop(guard);
        Ok(())
    }

    async fn store_token(&self, user_id: Uuid, token_uuid: Uuid, ttl: Duration) -> AppResult<()> {
        self.entries
            .write()
            .await
            .push(combined_key(user_id, token_uuid), StoreEntry::new(user_id, ttl));
        Ok(())
    }

    async fn fetch_auth(&self, user_id: Uuid, token_uuid: Uuid) -> AppResult<Option<Uuid>> {
        let key = combined_key(user_id, token_uuid);
        let mut guard = self.entries.write().await;

        if let Some(entry) = guard.get(&key) {
            if entry.is_expired() {
                guard.pop(&key);
                drop(guard);
                return Ok(None);
            }
            let stored = entry.user_id;
            drop(guard);
            return Ok(Some(stored));
        }
        drop(guard);
        Ok(None)
    }

    async fn delete_auth(&self, key: &str) -> AppResult<u64> {
        let removed = self.entries.write().await.pop(key);
        Ok(u64::from(removed.is_some()))
    }

    async fn delete_all_tokens_except(
        &self,
        user_id: Uuid,
        exempt_keys: &[String],
    ) -> AppResult<u64> {
        let pattern = glob::Pattern::new(&user_pattern(user_id))
            .map_err(|e| AppError::internal(format!("invalid store pattern: {e}")))?;

        let mut guard = self.entries.write().await;
        let doomed: Vec<String> = guard
            .iter()
            .filter_map(|(k, _)| {
                (pattern.matches(k) && !exempt_keys.contains(k)).then(|| k.clone())
            })
            .collect();

        for key in &doomed {
            guard.pop(key);
        }

        let removed = doomed.len() as u64;
        drop(guard);
        Ok(removed)
    }

    async fn add_request_count_entry(&self, client_ip: &str) -> AppResult<u64> {
        let window = Duration::from_secs(store_constants::RATE_LIMIT_WINDOW_SECS);
        let now = Instant::now();
        let mut entry = self
            .counters
            .entry(rate_limit_key(client_ip))
            .or_insert(CounterWindow {
                count: 0,
                window_start: now,
            });

        if now.duration_since(entry.window_start) > window {
            entry.count = 1;
            entry.window_start = now;
        } else {
            entry.count += 1;
        }
        Ok(entry.count)
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        // The task exits when every sender clone is gone; this just hurries
        // it along.
        if let Some(tx) = &self.shutdown_tx {
            if let Err(e) = tx.try_send(()) {
                tracing::debug!(error = ?e, "store shutdown signal send failed (channel likely closed)");
            }
        }
    }
}
