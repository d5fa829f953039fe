//! Access counters driving promotion.
//!
//! A counter only ever grows. It counts every logical touch of an entity (or
//! of one of its relation collections), cached reads included, so it is a
//! cumulative access count rather than a miss count. Counting never creates a
//! record.

use horizons_core::EntityType;

use crate::error::CacheError;
use crate::key::EntityKey;
use crate::store::DynStore;

#[derive(Clone)]
pub struct AccessCounter {
    store: DynStore,
}

impl AccessCounter {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    /// Increments and returns the counter for `key`, or for its `related`
    /// collection.
    pub async fn incr(&self, key: EntityKey, related: Option<EntityType>) -> Result<i64, CacheError> {
        self.store.incr(&key.count_key(related).encode()).await
    }

    /// Current value, `None` while the key is untracked.
    pub async fn current(
        &self,
        key: EntityKey,
        related: Option<EntityType>,
    ) -> Result<Option<i64>, CacheError> {
        self.store.get_counter(&key.count_key(related).encode()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyValueStore, MemoryStore};
    use std::sync::Arc;
    use tokio_test::block_on;

    #[tokio::test]
    async fn test_counters_are_scoped_per_relation() {
        let store = Arc::new(MemoryStore::new());
        let counter = AccessCounter::new(store.clone());
        let tag = EntityKey::new(EntityType::Tag, 7);

        assert_eq!(counter.incr(tag, None).await.unwrap(), 1);
        assert_eq!(counter.incr(tag, Some(EntityType::Topic)).await.unwrap(), 1);
        assert_eq!(counter.incr(tag, None).await.unwrap(), 2);

        assert_eq!(counter.current(tag, None).await.unwrap(), Some(2));
        assert_eq!(
            counter.current(tag, Some(EntityType::Topic)).await.unwrap(),
            Some(1)
        );
        assert_eq!(counter.current(tag, Some(EntityType::Category)).await.unwrap(), None);
    }

    #[test]
    fn test_counting_never_creates_a_record() {
        let store = Arc::new(MemoryStore::new());
        let counter = AccessCounter::new(store.clone());
        let tag = EntityKey::new(EntityType::Tag, 7);

        block_on(async {
            for _ in 0..10 {
                counter.incr(tag, None).await.unwrap();
            }
            assert!(!store.exists("tag:7").await.unwrap());
        });
        assert_eq!(store.keys(), vec!["tag:7:count".to_string()]);
    }
}
