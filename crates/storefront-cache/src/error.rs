//! Error types for the catalog cache.
//!
//! Most of these never reach a caller: backends log and swallow them. Only
//! programmer errors (bad scope, zero TTL, unserializable payload) are
//! returned from the facade's setters.

use std::time::Duration;

/// Errors produced inside the cache layer.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The payload could not be serialized for storage.
    #[error("Failed to encode cache payload: {0}")]
    Encode(#[source] serde_json::Error),

    /// A stored payload could not be deserialized.
    #[error("Failed to decode cache payload: {0}")]
    Decode(#[source] serde_json::Error),

    /// The caller supplied a scope that cannot form a key.
    #[error("Invalid cache key: {message}")]
    InvalidKey {
        /// Why the key was rejected.
        message: String,
    },

    /// The caller supplied a TTL that would expire immediately.
    #[error("Invalid cache TTL: {message}")]
    InvalidTtl {
        /// Why the TTL was rejected.
        message: String,
    },

    /// Could not reach the remote store.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
    },

    /// The remote store rejected or failed a command.
    #[error("Remote command `{command}` failed: {message}")]
    Command {
        /// The remote command that failed.
        command: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// A bounded remote operation did not complete in time.
    #[error("Remote operation `{operation}` timed out after {elapsed:?}")]
    Timeout {
        /// The remote operation that timed out.
        operation: &'static str,
        /// The configured bound.
        elapsed: Duration,
    },
}

impl CacheError {
    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidTtl` error.
    #[must_use]
    pub fn invalid_ttl(message: impl Into<String>) -> Self {
        Self::InvalidTtl {
            message: message.into(),
        }
    }

    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Command` error.
    #[must_use]
    pub fn command(command: &'static str, message: impl Into<String>) -> Self {
        Self::Command {
            command,
            message: message.into(),
        }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout(operation: &'static str, elapsed: Duration) -> Self {
        Self::Timeout { operation, elapsed }
    }

    /// Returns true for errors caused by the caller rather than the backend.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::Encode(_) | Self::InvalidKey { .. } | Self::InvalidTtl { .. }
        )
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(e: deadpool_redis::PoolError) -> Self {
        Self::connection(format!("failed to get Redis connection: {e}"))
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
