//! Behavioural tests for the per-type cache facade over the in-process store.

use horizons_cache::{CacheConfig, EntityCaches, EntityKey, KeyValueStore, MemoryStore};
use horizons_core::{EntityType, Tag, Topic, TopicTranslation, ParseMode};
use std::sync::Arc;
use time::OffsetDateTime;
use time::macros::datetime;

fn topic(id: i64, name: &str, category_id: i64) -> Topic {
    Topic {
        id,
        name: name.to_string(),
        created_at: datetime!(2024-01-01 00:00 UTC),
        edited_at: OffsetDateTime::UNIX_EPOCH,
        creator_user_id: None,
        cover_image_id: None,
        category_id,
    }
}

fn tag(id: i64, name: &str) -> Tag {
    Tag {
        id,
        name: name.to_string(),
        description: format!("{name} things"),
    }
}

fn setup() -> (Arc<MemoryStore>, EntityCaches) {
    let store = Arc::new(MemoryStore::new());
    let caches = EntityCaches::new(store.clone());
    (store, caches)
}

#[tokio::test]
async fn test_topic_is_promoted_once_threshold_is_reached() {
    let (_, caches) = setup();
    let policy = CacheConfig {
        promotion_threshold: 3,
    };

    for _ in 0..3 {
        caches.topics.incr(42, None).await.unwrap();
        assert_eq!(caches.topics.get(42).await.unwrap(), None);
    }

    // Fourth read: miss, load from the source, promote.
    let count = caches.topics.incr(42, None).await.unwrap();
    assert_eq!(count, 4);
    assert!(policy.is_hot(count));
    assert_eq!(caches.topics.get(42).await.unwrap(), None);

    let loaded = topic(42, "X", 1);
    caches.topics.set(42, &loaded).await.unwrap();
    assert_eq!(caches.topics.get(42).await.unwrap(), Some(loaded));
}

#[tokio::test]
async fn test_counting_below_threshold_never_caches() {
    let (store, caches) = setup();

    caches.topics.incr(42, None).await.unwrap();
    caches.topics.incr(42, None).await.unwrap();

    assert_eq!(caches.topics.get(42).await.unwrap(), None);
    assert!(!caches.topics.exists(42, None).await.unwrap());
    assert_eq!(store.keys(), vec!["topic:42:count".to_string()]);
}

#[tokio::test]
async fn test_tag_attached_then_detached_from_topic() {
    let (_, caches) = setup();
    caches.topics.set(10, &topic(10, "Wars", 1)).await.unwrap();
    caches.tags.set(7, &tag(7, "lore")).await.unwrap();

    caches.topics.add_relation(10, EntityType::Tag, 7).await.unwrap();
    let tags: Vec<Tag> = caches.topics.get_relations(10).await.unwrap();
    assert_eq!(tags, vec![tag(7, "lore")]);
    assert_eq!(
        caches.tags.back_relations(7).await.unwrap(),
        vec![EntityKey::new(EntityType::Topic, 10)]
    );

    caches.topics.delete_relation(10, EntityType::Tag, 7).await.unwrap();
    caches.tags.delete_back_relation(7, EntityType::Topic, 10).await.unwrap();

    assert!(caches.topics.get_relations::<Tag>(10).await.unwrap().is_empty());
    assert!(caches.tags.back_relations(7).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deleting_a_member_unhooks_it_from_owners() {
    let (_, caches) = setup();
    caches.topics.set(10, &topic(10, "Wars", 1)).await.unwrap();
    caches.tags.set(7, &tag(7, "lore")).await.unwrap();
    caches.tags.set(8, &tag(8, "maps")).await.unwrap();
    caches.topics.add_relation(10, EntityType::Tag, 7).await.unwrap();
    caches.topics.add_relation(10, EntityType::Tag, 8).await.unwrap();

    caches.tags.delete(7).await.unwrap();

    let snapshot = caches.topics.load_relations::<Tag>(10).await.unwrap();
    assert!(snapshot.is_complete());
    assert_eq!(snapshot.records, vec![tag(8, "maps")]);
    // The owner itself is untouched.
    assert_eq!(caches.topics.get(10).await.unwrap(), Some(topic(10, "Wars", 1)));
}

#[tokio::test]
async fn test_evicted_member_is_skipped() {
    let (store, caches) = setup();
    caches.tags.set(7, &tag(7, "lore")).await.unwrap();
    caches.tags.set(8, &tag(8, "maps")).await.unwrap();
    caches.topics.add_relation(10, EntityType::Tag, 7).await.unwrap();
    caches.topics.add_relation(10, EntityType::Tag, 8).await.unwrap();

    // Drop only the record, as an interrupted delete would.
    store.delete(&["tag:8".to_string()]).await.unwrap();

    let snapshot = caches.topics.load_relations::<Tag>(10).await.unwrap();
    assert_eq!(snapshot.members, 2);
    assert!(!snapshot.is_complete());
    assert_eq!(snapshot.records, vec![tag(7, "lore")]);
}

#[tokio::test]
async fn test_cascade_closure() {
    let (store, caches) = setup();
    let translation = |id: i64| TopicTranslation {
        id,
        translation_code: "en".into(),
        topic_id: 10,
        parse_mode: ParseMode::Markdown,
        text: String::new(),
        full_name: "English".into(),
    };

    caches.topics.set(10, &topic(10, "Wars", 1)).await.unwrap();
    for id in [1, 2] {
        caches.topic_translations.set(id, &translation(id)).await.unwrap();
        caches
            .topics
            .add_cascade(10, EntityType::TopicTranslation, id)
            .await
            .unwrap();
        caches
            .topics
            .add_relation(10, EntityType::TopicTranslation, id)
            .await
            .unwrap();
    }
    caches.topics.incr(10, None).await.unwrap();

    assert_eq!(caches.topics.delete(10).await.unwrap(), 3);

    assert_eq!(caches.topics.get(10).await.unwrap(), None);
    assert_eq!(caches.topic_translations.get(1).await.unwrap(), None);
    assert_eq!(caches.topic_translations.get(2).await.unwrap(), None);
    assert!(store.is_empty(), "left behind: {:?}", store.keys());
}

#[tokio::test]
async fn test_multi_level_cascade_from_category() {
    let (_, caches) = setup();
    caches.topics.set(10, &topic(10, "Wars", 1)).await.unwrap();
    caches.categories.add_cascade(1, EntityType::Topic, 10).await.unwrap();
    caches
        .topics
        .add_cascade(10, EntityType::TopicTranslation, 5)
        .await
        .unwrap();
    caches
        .topic_translations
        .set(
            5,
            &TopicTranslation {
                id: 5,
                translation_code: "de".into(),
                topic_id: 10,
                parse_mode: ParseMode::BbCode,
                text: "[i]Krieg[/i]".into(),
                full_name: "German".into(),
            },
        )
        .await
        .unwrap();

    caches.categories.delete(1).await.unwrap();

    assert_eq!(caches.topics.get(10).await.unwrap(), None);
    assert_eq!(caches.topic_translations.get(5).await.unwrap(), None);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (store, caches) = setup();

    assert_eq!(caches.tags.delete(99).await.unwrap(), 1);
    assert!(store.is_empty());

    caches.tags.set(7, &tag(7, "lore")).await.unwrap();
    caches.tags.delete(7).await.unwrap();
    caches.tags.delete(7).await.unwrap();
    assert_eq!(caches.tags.get(7).await.unwrap(), None);
}

#[tokio::test]
async fn test_delete_by_key_dispatches_on_type() {
    let (_, caches) = setup();
    caches.tags.set(7, &tag(7, "lore")).await.unwrap();

    caches
        .delete(EntityKey::new(EntityType::Tag, 7))
        .await
        .unwrap();
    assert_eq!(caches.tags.get(7).await.unwrap(), None);
}

#[tokio::test]
async fn test_corrupt_record_is_not_a_miss() {
    let (store, caches) = setup();
    store
        .replace_hash(
            "tag:7",
            vec![
                ("id".to_string(), "7".to_string()),
                ("name".to_string(), "lore".to_string()),
            ],
        )
        .await
        .unwrap();

    let err = caches.tags.get(7).await.unwrap_err();
    assert!(err.is_corrupt());
}
