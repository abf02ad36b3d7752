//! Remote backend over a shared key-value store.
//!
//! The store is reached through [`RemoteClient`], a narrow command set
//! (connect, get, set-with-ttl, scan, delete, disconnect). Every call is
//! bounded by the configured timeout so a hung store degrades to a miss.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::CacheBackend;
use crate::config::RemoteStoreConfig;
use crate::error::{CacheError, CacheResult};

/// Minimal command set the cache needs from a remote store.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Establish (or verify) connectivity.
    async fn connect(&self) -> CacheResult<()>;

    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()>;

    /// One step of an incremental key scan.
    ///
    /// Returns the next cursor (0 when the scan is complete) and a batch of
    /// keys matching the glob `pattern`.
    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> CacheResult<(u64, Vec<String>)>;

    /// Delete keys, returning how many existed.
    async fn del(&self, keys: &[String]) -> CacheResult<u64>;

    async fn disconnect(&self);
}

/// Constructs remote clients from configuration.
///
/// The resolver calls this at most once per cache instance, and only when a
/// remote endpoint is configured.
pub trait RemoteClientFactory: Send + Sync {
    fn create(&self, config: &RemoteStoreConfig) -> CacheResult<Arc<dyn RemoteClient>>;
}

/// Cache backend delegating to a [`RemoteClient`].
pub struct RemoteBackend {
    client: Arc<dyn RemoteClient>,
    op_timeout: Duration,
    scan_batch_size: usize,
    closed: AtomicBool,
}

impl RemoteBackend {
    pub fn new(client: Arc<dyn RemoteClient>, config: &RemoteStoreConfig) -> Self {
        Self {
            client,
            op_timeout: config.timeout(),
            scan_batch_size: config.scan_batch_size.max(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Run the client's connect step under the operation timeout.
    pub async fn connect(&self) -> CacheResult<()> {
        self.bounded("connect", self.client.connect()).await
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = CacheResult<T>>,
    ) -> CacheResult<T> {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::timeout(operation, self.op_timeout)),
        }
    }
}

#[async_trait]
impl CacheBackend for RemoteBackend {
    async fn get(&self, key: &str) -> Option<String> {
        match self.bounded("get", self.client.get(key)).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "remote cache GET failed");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let ttl_secs = ttl_to_secs(ttl);
        match self
            .bounded("set", self.client.set_ex(key, &value, ttl_secs))
            .await
        {
            Ok(()) => tracing::debug!(key = %key, ttl_secs, "cache set (remote)"),
            Err(e) => tracing::warn!(key = %key, error = %e, "remote cache SET failed"),
        }
    }

    async fn delete_by_prefix(&self, prefix: &str) -> u64 {
        let pattern = format!("{}*", escape_glob(prefix));
        let mut cursor = 0u64;
        let mut deleted = 0u64;

        loop {
            let (next, keys) = match self
                .bounded(
                    "scan",
                    self.client.scan(cursor, &pattern, self.scan_batch_size),
                )
                .await
            {
                Ok(step) => step,
                Err(e) => {
                    tracing::warn!(
                        prefix = %prefix,
                        deleted,
                        error = %e,
                        "remote cache SCAN failed, aborting prefix delete"
                    );
                    return deleted;
                }
            };

            if !keys.is_empty() {
                match self.bounded("del", self.client.del(&keys)).await {
                    Ok(n) => deleted += n,
                    Err(e) => {
                        tracing::warn!(
                            prefix = %prefix,
                            deleted,
                            error = %e,
                            "remote cache DEL failed, aborting prefix delete"
                        );
                        return deleted;
                    }
                }
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        tracing::debug!(prefix = %prefix, deleted, "cache prefix invalidated (remote)");
        deleted
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.client.disconnect().await;
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

/// Whole seconds for `SET EX`, which rejects a zero TTL.
fn ttl_to_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

/// Escape glob metacharacters so a prefix matches literally in `SCAN MATCH`.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
