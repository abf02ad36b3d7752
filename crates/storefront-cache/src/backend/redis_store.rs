//! Redis implementation of [`RemoteClient`] over a deadpool connection pool.

use std::sync::Arc;

use async_trait::async_trait;
use deadpool_redis::{Pool, PoolConfig, Runtime, Timeouts};
use redis::{AsyncCommands, RedisError};

use super::remote::{RemoteClient, RemoteClientFactory};
use crate::config::RemoteStoreConfig;
use crate::error::{CacheError, CacheResult};

/// Redis client backed by a connection pool.
///
/// Creating the pool does not open a connection; [`RemoteClient::connect`]
/// acquires one and pings it.
pub struct RedisClient {
    pool: Pool,
}

impl RedisClient {
    pub fn from_config(config: &RemoteStoreConfig) -> CacheResult<Self> {
        let timeout = Some(config.timeout());
        let mut timeouts = Timeouts::default();
        timeouts.wait = timeout;
        timeouts.create = timeout;
        timeouts.recycle = timeout;

        let mut pool_config = PoolConfig::new(config.pool_size);
        pool_config.timeouts = timeouts;

        let mut redis_config = deadpool_redis::Config::from_url(&config.url);
        redis_config.pool = Some(pool_config);

        let pool = redis_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::connection(format!("failed to create Redis pool: {e}")))?;

        Ok(Self { pool })
    }

    async fn conn(&self) -> CacheResult<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }
}

fn command_error(command: &'static str, e: RedisError) -> CacheError {
    if e.is_connection_refusal() || e.is_connection_dropped() || e.is_io_error() {
        CacheError::connection(format!("{command}: {e}"))
    } else {
        CacheError::command(command, e.to_string())
    }
}

#[async_trait]
impl RemoteClient for RedisClient {
    async fn connect(&self) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| command_error("PING", e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| command_error("GET", e))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(|e| command_error("SET", e))
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> CacheResult<(u64, Vec<String>)> {
        let mut conn = self.conn().await?;
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await
            .map_err(|e| command_error("SCAN", e))?;
        Ok((next, keys))
    }

    async fn del(&self, keys: &[String]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn().await?;
        conn.del::<_, u64>(keys)
            .await
            .map_err(|e| command_error("DEL", e))
    }

    async fn disconnect(&self) {
        self.pool.close();
        tracing::debug!("Redis pool closed");
    }
}

/// Factory producing [`RedisClient`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisClientFactory;

impl RemoteClientFactory for RedisClientFactory {
    fn create(&self, config: &RemoteStoreConfig) -> CacheResult<Arc<dyn RemoteClient>> {
        Ok(Arc::new(RedisClient::from_config(config)?))
    }
}
