use anyhow::Result;
use horizons_cache::{DynStore, EntityCaches, EntityKey, KeyValueStore};
use serde_json::{Value, json};
use std::time::Instant;

use crate::config::AppConfig;

pub async fn ping(store: &DynStore) -> Result<Value> {
    let started = Instant::now();
    store.ping().await?;
    Ok(json!({
        "backend": store.backend_name(),
        "status": "ok",
        "latency_ms": started.elapsed().as_secs_f64() * 1000.0,
    }))
}

/// Deletes `key` and its cascade closure. Returns how many entities were purged.
pub async fn evict(store: &DynStore, key: EntityKey) -> Result<usize> {
    let purged = EntityCaches::new(store.clone()).delete(key).await?;
    tracing::info!(key = %key, purged, "evicted from cache");
    Ok(purged)
}

pub fn show_config(cfg: &AppConfig) -> Result<String> {
    Ok(toml::to_string_pretty(cfg)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizons_cache::MemoryStore;
    use horizons_core::{EntityType, Tag};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_evict_purges_cascade() {
        let memory = Arc::new(MemoryStore::new());
        let store: DynStore = memory.clone();
        let caches = EntityCaches::new(store.clone());
        let tag = Tag {
            id: 7,
            name: "lore".into(),
            description: String::new(),
        };
        caches.tags.set(7, &tag).await.unwrap();
        caches.topics.add_cascade(10, EntityType::Tag, 7).await.unwrap();

        let purged = evict(&store, EntityKey::new(EntityType::Topic, 10)).await.unwrap();
        assert_eq!(purged, 2);
        assert!(!memory.exists("tag:7").await.unwrap());
    }

    #[test]
    fn test_show_config_round_trips() {
        let rendered = show_config(&AppConfig::default()).unwrap();
        assert!(rendered.contains("promotion_threshold = 3"));
        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.redis.url, "redis://localhost:6379");
    }
}
