use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, IntoConnectionInfo};

use crate::cache::link::{CacheConnection, CacheConnector, SetMode};
use crate::config::CacheConfig;
use crate::error::Result;

/// Opens multiplexed Redis connections against one address and database.
pub struct RedisConnector {
    client: redis::Client,
}

impl RedisConnector {
    /// Creates a new `RedisConnector`.
    ///
    /// # Arguments
    ///
    /// * `config` - URL, credentials and database index.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let mut info = config.redis_url.as_str().into_connection_info()?;
        info.redis.db = config.db;
        if let Some(password) = &config.password {
            info.redis.password = Some(password.clone());
        }

        Ok(Self {
            client: redis::Client::open(info)?,
        })
    }
}

#[async_trait]
impl CacheConnector for RedisConnector {
    async fn connect(&self) -> Result<Arc<dyn CacheConnection>> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        tracing::debug!("Redis connection opened");
        Ok(Arc::new(RedisConnection { conn }))
    }
}

/// A single multiplexed connection; clones share the same socket.
pub struct RedisConnection {
    conn: MultiplexedConnection,
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheConnection for RedisConnection {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration, mode: SetMode) -> Result<bool> {
        let mut conn = self.conn.clone();
        match mode {
            SetMode::Always => {
                let _: () = conn.set_ex(key, value, ttl_secs(ttl)).await?;
                Ok(true)
            }
            SetMode::IfAbsent => {
                let reply: Option<String> = redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("NX")
                    .arg("EX")
                    .arg(ttl_secs(ttl))
                    .query_async(&mut conn)
                    .await?;
                Ok(reply.is_some())
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.incr(key, 1).await?;
        Ok(value)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.keys(pattern).await?;
        Ok(keys)
    }
}
