//! Response cache stores
//!
//! The gateway talks to a [`CacheStore`] holding opaque string values with a
//! TTL. Store failures are never fatal: the gateway treats them as a miss.
//!
//! [`MemoryCacheStore`] is the process-local store. Expiry is checked on
//! read and expired entries are dropped lazily; there is no sweeper task.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

/// Cache store errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A cached answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content: String,
    /// Model that produced the answer
    pub model: String,
    pub tokens: u32,
    /// Estimated cost of the original call
    pub cost_usd: f64,
}

impl CacheEntry {
    pub fn to_json(&self) -> Result<String, CacheError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(value: &str) -> Result<Self, CacheError> {
        Ok(serde_json::from_str(value)?)
    }
}

/// Key-value store with per-entry TTL
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a live value; expired entries read as `None`
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value that expires after `ttl`
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Store name for logs
    fn name(&self) -> &str;
}

/// Thread-safe reference to a cache store
pub type SharedCacheStore = Arc<dyn CacheStore>;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Instant,
}

/// Process-local cache store
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, StoredValue>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared in-memory store
    pub fn shared() -> SharedCacheStore {
        Arc::new(Self::new())
    }

    /// Number of stored entries, including expired ones not yet read
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, stored| stored.expires_at > now);
        before - self.entries.len()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        match self.entries.get(key) {
            None => return Ok(None),
            Some(stored) if stored.expires_at > now => return Ok(Some(stored.value.clone())),
            Some(_) => {}
        }

        debug!(key = %key, "Cache entry expired, removing");
        self.entries
            .remove_if(key, |_, stored| stored.expires_at <= now);
        Ok(None)
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now() + ttl;
        self.entries
            .insert(key.to_string(), StoredValue { value, expires_at });
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
