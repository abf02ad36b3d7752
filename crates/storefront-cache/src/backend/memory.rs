//! Process-local backend with per-entry expiry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::CacheBackend;

/// Upper bound applied when `now + ttl` would overflow the clock.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// A stored value with its absolute expiry.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub value: String,
    pub expires_at: Instant,
}

impl CachedEntry {
    pub fn new(value: String, ttl: Duration) -> Self {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + MAX_TTL);
        Self { value, expires_at }
    }

    /// Check if this entry has expired as of `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// In-process cache backend.
///
/// Always available and needs no configuration. Expiry is lazy: an expired
/// entry is dropped when it is next read, when a prefix delete passes over
/// it, or by [`InMemoryBackend::purge_expired`] if a sweeper is running.
/// Expiry is measured on the tokio clock so paused-time tests can advance it.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    entries: DashMap<String, CachedEntry>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.entries.retain(|_, entry| {
            if entry.is_expired_at(now) {
                removed += 1;
                false
            } else {
                true
            }
        });

        removed
    }

    /// Spawn a background task purging expired entries every `interval`.
    ///
    /// The task runs until the returned handle is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let backend = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = backend.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, "purged expired in-process cache entries");
                }
            }
        })
    }
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired_at(now) {
                return Some(entry.value.clone());
            }
        } else {
            return None;
        }

        // Expired: the read guard is released above, so removal cannot deadlock.
        // A concurrent `set` may have replaced it meanwhile, hence the re-check.
        self.entries
            .remove_if(key, |_, entry| entry.is_expired_at(now));
        tracing::debug!(key = %key, "in-process cache entry expired");
        None
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        self.entries
            .insert(key.to_string(), CachedEntry::new(value, ttl));
        tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "cache set (in-process)");
    }

    async fn delete_by_prefix(&self, prefix: &str) -> u64 {
        let now = Instant::now();
        let mut removed = 0u64;
        self.entries.retain(|key, entry| {
            if key.starts_with(prefix) {
                // Expired entries are dropped but were already absent.
                if !entry.is_expired_at(now) {
                    removed += 1;
                }
                false
            } else {
                true
            }
        });
        tracing::debug!(prefix = %prefix, removed, "cache prefix invalidated (in-process)");
        removed
    }

    async fn close(&self) {
        self.entries.clear();
    }

    fn name(&self) -> &'static str {
        "in-process"
    }
}
