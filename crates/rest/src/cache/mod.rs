//! Optional response cache.
//!
//! The cache is a pure optimization. Every helper in this module swallows
//! errors and logs them, so a miss and a failure look the same to callers.
//!
//! # Implementations
//!
//! - [`NoopCache`] - never stores anything
//! - [`MemoryCache`] - process-local map with per-entry expiry
//! - `RedisCache` - shared cache, behind the `redis` feature

mod memory;
#[cfg(feature = "redis")]
mod redis;

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ServerConfig;

pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use self::redis::RedisCache;

/// Errors raised by cache implementations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache could not be reached.
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// A command was rejected.
    #[error("cache command failed: {0}")]
    Command(String),
}

/// A string-keyed cache with per-entry time to live.
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Reads a value.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores a value for `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Removes a value.
    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

/// A cache that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl Cache for NoopCache {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn del(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Picks the in-process cache for `config`.
///
/// A zero TTL disables caching.
pub fn local_cache(config: &ServerConfig) -> Arc<dyn Cache> {
    if config.cache_ttl_secs == 0 {
        Arc::new(NoopCache)
    } else {
        Arc::new(MemoryCache::new())
    }
}

/// Key for a single catalog entry.
pub fn medicine_key(id: &str) -> String {
    format!("medicine:{}", id)
}

/// Holds the current generation of catalog search entries.
pub const SEARCH_GENERATION_KEY: &str = "medicines:search-generation";

/// Key for a catalog search.
///
/// `query` must already be normalized the way the store searches it. The key
/// embeds the current search generation, so [`invalidate_searches`] retires
/// every earlier search entry at once.
pub async fn search_key(cache: &dyn Cache, query: &str) -> String {
    let generation = get_json::<String>(cache, SEARCH_GENERATION_KEY)
        .await
        .unwrap_or_else(|| "0".to_string());
    format!("medicines:search:{}:{}", generation, query)
}

/// Starts a new search generation after a catalog change.
///
/// The generation marker outlives `ttl` so that entries from the previous
/// generation have expired before it could lapse back to the initial one.
pub async fn invalidate_searches(cache: &dyn Cache, ttl: Duration) {
    let generation = format!("{:x}", Utc::now().timestamp_micros());
    set_json(cache, SEARCH_GENERATION_KEY, &generation, ttl * 2).await;
}

/// Reads and decodes a JSON value. Errors and undecodable entries are misses.
pub async fn get_json<T>(cache: &dyn Cache, key: &str) -> Option<T>
where
    T: DeserializeOwned,
{
    match cache.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, cache = cache.name(), "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(key, cache = cache.name(), error = %e, "Cache read failed");
            None
        }
    }
}

/// Encodes and stores a JSON value, logging any failure.
pub async fn set_json<T>(cache: &dyn Cache, key: &str, value: &T, ttl: Duration)
where
    T: Serialize + ?Sized,
{
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(key, error = %e, "Failed to encode cache entry");
            return;
        }
    };
    if let Err(e) = cache.set(key, raw, ttl).await {
        warn!(key, cache = cache.name(), error = %e, "Cache write failed");
    }
}

/// Removes an entry, logging any failure.
pub async fn invalidate(cache: &dyn Cache, key: &str) {
    if let Err(e) = cache.del(key).await {
        warn!(key, cache = cache.name(), error = %e, "Cache delete failed");
    }
}
