//! Key-value store abstraction the cache is layered on.
//!
//! The command set mirrors the subset of Redis the cache needs: hashes for
//! records, integer counters, and unordered string sets for graph edges.
//! Every call is one independent round trip; nothing here spans keys
//! transactionally except [`KeyValueStore::replace_hash`].

mod memory;
mod redis;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RedisConfig;
use crate::error::CacheError;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Field map of one stored hash.
pub type RawHash = HashMap<String, String>;

/// Backing store for the cache. Implementations must be thread-safe.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Replaces the hash at `key` with exactly `fields`.
    ///
    /// Existing fields not present in `fields` are removed. An empty `fields`
    /// leaves no key behind.
    async fn replace_hash(&self, key: &str, fields: Vec<(String, String)>) -> Result<(), CacheError>;

    /// Returns the hash at `key`, or `None` if the key does not exist.
    async fn get_hash(&self, key: &str) -> Result<Option<RawHash>, CacheError>;

    /// Batched [`get_hash`](Self::get_hash) in one round trip, positionally
    /// aligned with `keys`.
    async fn get_hashes(&self, keys: &[String]) -> Result<Vec<Option<RawHash>>, CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Deletes every key in `keys`, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError>;

    /// Atomically increments the counter at `key`, creating it at zero.
    async fn incr(&self, key: &str) -> Result<i64, CacheError>;

    /// Reads the counter at `key` without modifying it.
    async fn get_counter(&self, key: &str) -> Result<Option<i64>, CacheError>;

    /// Adds `member` to the set at `key`. Returns `false` if already present.
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, CacheError>;

    /// Removes `member` from the set at `key`. Returns `false` if absent.
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, CacheError>;

    /// Members of the set at `key` in unspecified order.
    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError>;

    /// Round trip used by health checks.
    async fn ping(&self) -> Result<(), CacheError>;

    /// Name of this backend for logging.
    fn backend_name(&self) -> &'static str;
}

/// Shared handle to a store, injected into every cache component.
pub type DynStore = Arc<dyn KeyValueStore>;

/// Creates the store selected by configuration.
///
/// - **Redis disabled**: a process-local [`MemoryStore`]
/// - **Redis enabled**: a pooled [`RedisStore`], verified with a `PING`
///
/// A Redis connection failure is returned rather than degraded to a local
/// store, since a per-process cache would miss invalidations issued by other
/// instances.
pub async fn connect_store(config: &RedisConfig) -> Result<DynStore, CacheError> {
    if !config.enabled {
        tracing::info!("Redis disabled, using in-process cache store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let timeout = Duration::from_millis(config.timeout_ms);
    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let pool_config = redis_config.pool.get_or_insert_with(Default::default);
    pool_config.max_size = config.pool_size;
    pool_config.timeouts.wait = Some(timeout);
    pool_config.timeouts.create = Some(timeout);
    pool_config.timeouts.recycle = Some(timeout);

    let pool = redis_config
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .map_err(|e| CacheError::unavailable(format!("failed to create Redis pool: {e}")))?;

    let store = RedisStore::new(pool);
    store.ping().await?;
    tracing::info!("Connected to Redis");

    Ok(Arc::new(store))
}
