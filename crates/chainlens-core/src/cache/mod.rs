//! Cache-aside layer for query responses.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │                 ResponseCache                   │
//! │  namespace prefix · default TTL · JSON codec    │
//! └───────────────────────┬────────────────────────┘
//!                         │ Arc<dyn CacheStore>
//!             ┌───────────┴───────────┐
//!     ┌───────▼───────┐       ┌───────▼───────┐
//!     │  RedisStore   │       │  MemoryStore  │
//!     │ ConnectionMgr │       │ DashMap, lazy │
//!     │ (shared pool) │       │ TTL expiry    │
//!     └───────────────┘       └───────────────┘
//! ```
//!
//! Keys are `<namespace>:<kind>:<id>`, e.g. `chain:latest_block:ethereum`. Values are JSON
//! strings. Entries are only ever evicted by TTL.
//!
//! This layer reports backend failures as [`CacheError`]; deciding that a failed lookup
//! behaves like a miss is the caller's policy.

pub mod memory_store;
pub mod redis_store;

pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::{fmt, sync::Arc, time::Duration};

use crate::chain::ChainId;

/// Errors raised by a cache backend or by the JSON codec around it.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache value encoding error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        Self::Backend(e.to_string())
    }
}

/// Key-value store with per-key TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored value, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key`, replacing any previous value and TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Resets the TTL of an existing key. Returns `false` if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;

    /// Backend name for logs and `/health`.
    fn backend_name(&self) -> &'static str;
}

/// Typed cache key. Rendered with the namespace by [`ResponseCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKey<'a> {
    LatestBlock(ChainId),
    TxHash(&'a str),
    TotalTx(ChainId),
}

impl CacheKey<'_> {
    /// Kind segment of the key, also used as a metrics label.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LatestBlock(_) => "latest_block",
            Self::TxHash(_) => "tx_hash",
            Self::TotalTx(_) => "total_tx",
        }
    }
}

impl fmt::Display for CacheKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LatestBlock(chain) | Self::TotalTx(chain) => write!(f, "{}:{chain}", self.kind()),
            Self::TxHash(hash) => write!(f, "{}:{hash}", self.kind()),
        }
    }
}

/// Namespaced JSON cache over a [`CacheStore`].
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    namespace: Arc<str>,
    default_ttl: Duration,
}

impl ResponseCache {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, namespace: &str, default_ttl: Duration) -> Self {
        Self { store, namespace: Arc::from(namespace), default_ttl }
    }

    /// Full key as stored in the backend.
    #[must_use]
    pub fn render_key(&self, key: &CacheKey<'_>) -> String {
        format!("{}:{key}", self.namespace)
    }

    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Reads and decodes a cached value.
    ///
    /// # Errors
    ///
    /// Backend failures, or [`CacheError::Serialization`] if the stored value does not
    /// decode as `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        key: &CacheKey<'_>,
    ) -> Result<Option<T>, CacheError> {
        match self.store.get(&self.render_key(key)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encodes and stores a value with the default TTL.
    ///
    /// # Errors
    ///
    /// Encoding or backend failures.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &CacheKey<'_>,
        value: &T,
    ) -> Result<(), CacheError> {
        self.set_json_with_ttl(key, value, self.default_ttl).await
    }

    /// Encodes and stores a value with an explicit TTL.
    ///
    /// # Errors
    ///
    /// Encoding or backend failures.
    pub async fn set_json_with_ttl<T: Serialize + ?Sized>(
        &self,
        key: &CacheKey<'_>,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let encoded = serde_json::to_string(value)?;
        self.store.set(&self.render_key(key), &encoded, ttl).await
    }

    /// Resets the TTL of an existing entry.
    ///
    /// # Errors
    ///
    /// Backend failures.
    pub async fn expire(&self, key: &CacheKey<'_>, ttl: Duration) -> Result<bool, CacheError> {
        self.store.expire(&self.render_key(key), ttl).await
    }
}
