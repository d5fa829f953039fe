//! Integration tests for the Redis-backed store.
//!
//! Tests use testcontainers to spin up a real Redis instance.

use horizons_cache::{
    CacheError, EntityCaches, KeyValueStore, RedisConfig, connect_store,
};
use horizons_core::{EntityType, Tag};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{}", host_port);

            (container, url)
        })
        .await;

    url.clone()
}

async fn redis_config() -> RedisConfig {
    RedisConfig {
        enabled: true,
        url: get_redis_url().await,
        pool_size: 5,
        timeout_ms: 5000,
    }
}

#[tokio::test]
async fn test_disabled_redis_uses_memory_store() {
    let store = connect_store(&RedisConfig::default()).await.unwrap();
    assert_eq!(store.backend_name(), "memory");
}

#[tokio::test]
async fn test_unreachable_redis_is_an_error() {
    let config = RedisConfig {
        enabled: true,
        url: "redis://127.0.0.1:1".to_string(),
        pool_size: 1,
        timeout_ms: 200,
    };
    let err = connect_store(&config).await.err().expect("connection must fail");
    assert!(err.is_unavailable());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_connection() {
    let store = connect_store(&redis_config().await).await.unwrap();
    assert_eq!(store.backend_name(), "redis");
    store.ping().await.unwrap();
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_hash_replace_drops_stale_fields() {
    let store = connect_store(&redis_config().await).await.unwrap();
    let key = "test:replace";

    store
        .replace_hash(
            key,
            vec![("a".into(), "1".into()), ("b".into(), "2".into())],
        )
        .await
        .unwrap();
    store
        .replace_hash(key, vec![("a".into(), "3".into())])
        .await
        .unwrap();

    let hash = store.get_hash(key).await.unwrap().unwrap();
    assert_eq!(hash.len(), 1);
    assert_eq!(hash["a"], "3");

    let rows = store
        .get_hashes(&[key.to_string(), "test:missing".to_string()])
        .await
        .unwrap();
    assert!(rows[0].is_some());
    assert!(rows[1].is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_wrong_type_is_reported() {
    let store = connect_store(&redis_config().await).await.unwrap();
    store.set_add("test:wrongtype", "x").await.unwrap();

    let err = store.incr("test:wrongtype").await.unwrap_err();
    assert!(matches!(err, CacheError::WrongType { .. }));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_entity_cache_round_trip() {
    let store = connect_store(&redis_config().await).await.unwrap();
    let caches = EntityCaches::new(store.clone());
    let tag = Tag {
        id: 9001,
        name: "null".into(),
        description: String::new(),
    };

    caches.tags.set(tag.id, &tag).await.unwrap();
    caches
        .topics
        .add_relation(9002, EntityType::Tag, tag.id)
        .await
        .unwrap();

    assert_eq!(caches.tags.get(tag.id).await.unwrap(), Some(tag.clone()));
    assert_eq!(caches.topics.get_relations::<Tag>(9002).await.unwrap(), vec![tag.clone()]);

    caches.tags.delete(tag.id).await.unwrap();
    assert_eq!(caches.tags.get(tag.id).await.unwrap(), None);
    assert!(!caches.topics.exists(9002, Some(EntityType::Tag)).await.unwrap());
}
