use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::time::Duration;
use tracing::info;

use super::{CacheError, CacheStore};

/// Redis-backed [`CacheStore`].
///
/// Wraps a [`ConnectionManager`], which multiplexes one connection and reconnects on
/// failure. Cloning the manager is cheap, so each call works on its own handle.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Opens the client and establishes the managed connection.
    ///
    /// # Errors
    ///
    /// [`CacheError::Backend`] if the URL is invalid or the server is unreachable.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;
        info!("redis cache connected");
        Ok(Self { connection })
    }
}

/// Redis expiries are whole seconds; sub-second TTLs round up so they never mean "no TTL".
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let () = conn.set_ex(key, value, ttl_seconds(ttl)).await?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut conn = self.connection.clone();
        let secs = i64::try_from(ttl_seconds(ttl)).unwrap_or(i64::MAX);
        let updated: bool = conn.expire(key, secs).await?;
        Ok(updated)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
