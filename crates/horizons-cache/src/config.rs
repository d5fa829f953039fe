use serde::{Deserialize, Serialize};

/// Redis connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Use Redis as the cache store. When disabled the cache lives in process memory.
    /// Default: false
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_enabled() -> bool {
    false
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

/// Promotion policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Accesses an entity needs before its record is cached
    #[serde(default = "default_promotion_threshold")]
    pub promotion_threshold: u64,
}

fn default_promotion_threshold() -> u64 {
    3
}

impl CacheConfig {
    /// Whether an access count has reached the promotion threshold.
    pub fn is_hot(&self, count: i64) -> bool {
        u64::try_from(count).is_ok_and(|c| c >= self.promotion_threshold)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            promotion_threshold: default_promotion_threshold(),
        }
    }
}
