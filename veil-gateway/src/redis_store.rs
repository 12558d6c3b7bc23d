//! Redis-backed cache store
//!
//! Uses a `ConnectionManager`, which reconnects on its own after the server
//! drops. Expiry is delegated to Redis via `SETEX`.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use crate::{CacheError, CacheStore};

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Unavailable(e.to_string())
    }
}

/// Cache store backed by a Redis server
#[derive(Clone)]
pub struct RedisCacheStore {
    manager: ConnectionManager,
}

impl RedisCacheStore {
    /// Connect to `redis_url` (e.g. `redis://127.0.0.1:6379/0`)
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        info!("Connected to Redis cache");
        Ok(Self { manager })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        // SETEX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, seconds).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "redis"
    }
}
