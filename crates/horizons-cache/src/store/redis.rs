//! Redis store over a `deadpool-redis` connection pool.

use ::redis::{AsyncCommands, RedisError};
use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};

use super::{KeyValueStore, RawHash};
use crate::error::CacheError;

/// Multi-instance store shared by every server process.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<Connection, CacheError> {
        Ok(self.pool.get().await?)
    }
}

/// Attaches the key to server-side type errors; everything else is an
/// availability failure.
fn command_error(key: &str, expected: &'static str, e: RedisError) -> CacheError {
    if e.code() == Some("WRONGTYPE") {
        CacheError::wrong_type(key, expected)
    } else {
        tracing::warn!(key = %key, error = %e, "Redis command failed");
        CacheError::unavailable(e.to_string())
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn replace_hash(&self, key: &str, fields: Vec<(String, String)>) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let mut pipe = ::redis::pipe();
        pipe.atomic().del(key).ignore();
        if !fields.is_empty() {
            pipe.hset_multiple(key, fields.as_slice()).ignore();
        }
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| command_error(key, "hash", e))?;
        tracing::debug!(key = %key, fields = fields.len(), "hash replaced");
        Ok(())
    }

    async fn get_hash(&self, key: &str) -> Result<Option<RawHash>, CacheError> {
        let mut conn = self.conn().await?;
        let fields: RawHash = conn
            .hgetall(key)
            .await
            .map_err(|e| command_error(key, "hash", e))?;
        Ok((!fields.is_empty()).then_some(fields))
    }

    async fn get_hashes(&self, keys: &[String]) -> Result<Vec<Option<RawHash>>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let mut pipe = ::redis::pipe();
        for key in keys {
            pipe.hgetall(key);
        }
        let rows: Vec<RawHash> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| command_error(&keys.join(","), "hash", e))?;
        Ok(rows
            .into_iter()
            .map(|fields| (!fields.is_empty()).then_some(fields))
            .collect())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn().await?;
        conn.exists(key)
            .await
            .map_err(|e| command_error(key, "any", e))
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn().await?;
        let removed: u64 = conn
            .del(keys)
            .await
            .map_err(|e| command_error(&keys.join(","), "any", e))?;
        tracing::debug!(requested = keys.len(), removed, "keys deleted");
        Ok(removed)
    }

    async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        let mut conn = self.conn().await?;
        conn.incr(key, 1_i64)
            .await
            .map_err(|e| command_error(key, "counter", e))
    }

    async fn get_counter(&self, key: &str) -> Result<Option<i64>, CacheError> {
        let mut conn = self.conn().await?;
        conn.get(key)
            .await
            .map_err(|e| command_error(key, "counter", e))
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn().await?;
        let added: u64 = conn
            .sadd(key, member)
            .await
            .map_err(|e| command_error(key, "set", e))?;
        Ok(added > 0)
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn().await?;
        let removed: u64 = conn
            .srem(key, member)
            .await
            .map_err(|e| command_error(key, "set", e))?;
        Ok(removed > 0)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn().await?;
        conn.smembers(key)
            .await
            .map_err(|e| command_error(key, "set", e))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
