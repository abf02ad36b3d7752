//! Cache backends.
//!
//! ## Architecture
//!
//! - **In-process** (DashMap): always available, per-instance, lost on restart
//! - **Remote** (Redis): shared across instances, used when configured and reachable
//!
//! Exactly one backend serves an instance at a time; the resolver picks it
//! once and there is no dual-write or read-repair between the two.
//!
//! ## Failure Contract
//!
//! Backends never surface errors. A failed read is a miss, a failed write
//! is dropped, and a failed prefix delete reports how many keys it managed
//! to remove before giving up.

pub mod memory;
pub mod redis_store;
pub mod remote;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

pub use memory::InMemoryBackend;
pub use redis_store::{RedisClient, RedisClientFactory};
pub use remote::{RemoteBackend, RemoteClient, RemoteClientFactory};

/// Uniform storage contract implemented by every backend.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch a stored value.
    ///
    /// Returns `None` for missing, expired, or unreadable entries. Never
    /// returns stale data.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a value with a TTL. Best-effort: failures are logged only.
    async fn set(&self, key: &str, value: String, ttl: Duration);

    /// Remove every key starting with `prefix`, returning how many were removed.
    async fn delete_by_prefix(&self, prefix: &str) -> u64;

    /// Release held resources. Idempotent.
    async fn close(&self);

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Which backend an instance resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// No operation has run yet.
    Unresolved,
    /// Connected to the shared remote store.
    Remote,
    /// Process-local storage.
    InProcess,
}

impl BackendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendMode::Unresolved => "unresolved",
            BackendMode::Remote => "remote",
            BackendMode::InProcess => "in-process",
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
