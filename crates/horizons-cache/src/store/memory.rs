//! In-process store over `DashMap`.
//!
//! Follows Redis semantics closely enough for the cache to behave the same on
//! either backend: typed values with `WRONGTYPE`-style errors, and hashes or
//! sets that disappear once their last field or member is removed.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{KeyValueStore, RawHash};
use crate::error::CacheError;

#[derive(Debug, Clone)]
enum Value {
    Hash(RawHash),
    Set(HashSet<String>),
    Counter(i64),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Hash(_) => "hash",
            Value::Set(_) => "set",
            Value::Counter(_) => "counter",
        }
    }
}

/// Single-instance store. Cheap to clone; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<DashMap<String, Value>>,
    outage: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the store going away: every command fails with
    /// [`CacheError::Unavailable`] until switched back.
    pub fn set_outage(&self, down: bool) {
        self.outage.store(down, Ordering::SeqCst);
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Snapshot of all live keys, for inspection in tests and tooling.
    pub fn keys(&self) -> Vec<String> {
        self.data.iter().map(|e| e.key().clone()).collect()
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(CacheError::unavailable("in-memory store is marked down"));
        }
        Ok(())
    }

    fn read_hash(&self, key: &str) -> Result<Option<RawHash>, CacheError> {
        match self.data.get(key).as_deref() {
            None => Ok(None),
            Some(Value::Hash(fields)) => Ok(Some(fields.clone())),
            Some(_) => Err(CacheError::wrong_type(key, "hash")),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn replace_hash(&self, key: &str, fields: Vec<(String, String)>) -> Result<(), CacheError> {
        self.check()?;
        if fields.is_empty() {
            self.data.remove(key);
        } else {
            let fields: HashMap<_, _> = fields.into_iter().collect();
            self.data.insert(key.to_string(), Value::Hash(fields));
        }
        Ok(())
    }

    async fn get_hash(&self, key: &str) -> Result<Option<RawHash>, CacheError> {
        self.check()?;
        self.read_hash(key)
    }

    async fn get_hashes(&self, keys: &[String]) -> Result<Vec<Option<RawHash>>, CacheError> {
        self.check()?;
        keys.iter().map(|key| self.read_hash(key)).collect()
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.check()?;
        Ok(self.data.contains_key(key))
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        self.check()?;
        let removed = keys
            .iter()
            .filter(|key| self.data.remove(key.as_str()).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        self.check()?;
        let mut entry = self
            .data
            .entry(key.to_string())
            .or_insert(Value::Counter(0));
        match entry.value_mut() {
            Value::Counter(n) => {
                *n += 1;
                Ok(*n)
            }
            other => {
                tracing::debug!(key = %key, found = other.kind(), "INCR on non-counter key");
                Err(CacheError::wrong_type(key, "counter"))
            }
        }
    }

    async fn get_counter(&self, key: &str) -> Result<Option<i64>, CacheError> {
        self.check()?;
        match self.data.get(key).as_deref() {
            None => Ok(None),
            Some(Value::Counter(n)) => Ok(Some(*n)),
            Some(_) => Err(CacheError::wrong_type(key, "counter")),
        }
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        self.check()?;
        let mut entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Value::Set(HashSet::new()));
        match entry.value_mut() {
            Value::Set(members) => Ok(members.insert(member.to_string())),
            _ => Err(CacheError::wrong_type(key, "set")),
        }
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        self.check()?;
        match self.data.entry(key.to_string()) {
            Entry::Vacant(_) => Ok(false),
            Entry::Occupied(mut occupied) => {
                let (removed, now_empty) = match occupied.get_mut() {
                    Value::Set(members) => (members.remove(member), members.is_empty()),
                    _ => return Err(CacheError::wrong_type(key, "set")),
                };
                if now_empty {
                    occupied.remove();
                }
                Ok(removed)
            }
        }
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        self.check()?;
        match self.data.get(key).as_deref() {
            None => Ok(Vec::new()),
            Some(Value::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(_) => Err(CacheError::wrong_type(key, "set")),
        }
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.check()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replace_hash_drops_stale_fields() {
        let store = MemoryStore::new();
        store
            .replace_hash("tag:1", vec![("a".into(), "1".into()), ("b".into(), "2".into())])
            .await
            .unwrap();
        store
            .replace_hash("tag:1", vec![("a".into(), "3".into())])
            .await
            .unwrap();

        let hash = store.get_hash("tag:1").await.unwrap().unwrap();
        assert_eq!(hash.len(), 1);
        assert_eq!(hash["a"], "3");
    }

    #[tokio::test]
    async fn test_counter_increments_from_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.get_counter("tag:1:count").await.unwrap(), None);
        assert_eq!(store.incr("tag:1:count").await.unwrap(), 1);
        assert_eq!(store.incr("tag:1:count").await.unwrap(), 2);
        assert_eq!(store.get_counter("tag:1:count").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_wrong_type_is_reported() {
        let store = MemoryStore::new();
        store.set_add("topic:1:tag", "tag:1").await.unwrap();

        let err = store.incr("topic:1:tag").await.unwrap_err();
        assert!(matches!(err, CacheError::WrongType { .. }));
        let err = store.get_hash("topic:1:tag").await.unwrap_err();
        assert!(err.is_corrupt());
    }

    #[tokio::test]
    async fn test_empty_set_disappears() {
        let store = MemoryStore::new();
        assert!(store.set_add("topic:1:tag", "tag:1").await.unwrap());
        assert!(!store.set_add("topic:1:tag", "tag:1").await.unwrap());
        assert!(store.set_remove("topic:1:tag", "tag:1").await.unwrap());
        assert!(!store.set_remove("topic:1:tag", "tag:1").await.unwrap());
        assert!(!store.exists("topic:1:tag").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_batched_reads_keep_positions() {
        let store = MemoryStore::new();
        store
            .replace_hash("tag:2", vec![("id".into(), "2".into())])
            .await
            .unwrap();

        let rows = store
            .get_hashes(&["tag:1".to_string(), "tag:2".to_string()])
            .await
            .unwrap();
        assert!(rows[0].is_none());
        assert_eq!(rows[1].as_ref().unwrap()["id"], "2");
    }

    #[tokio::test]
    async fn test_outage_fails_every_command() {
        let store = MemoryStore::new();
        store.set_outage(true);
        assert!(store.ping().await.unwrap_err().is_unavailable());
        assert!(store.incr("tag:1:count").await.unwrap_err().is_unavailable());

        store.set_outage(false);
        assert!(store.ping().await.is_ok());
    }
}
