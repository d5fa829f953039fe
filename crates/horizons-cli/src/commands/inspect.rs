use anyhow::Result;
use horizons_cache::{
    AccessCounter, CacheEntity, CacheKey, CacheRecord, DecodeError, DynStore, EntityKey,
    KeySuffix, RecordStore, RelationGraph,
};
use horizons_core::{Category, EntityType, Tag, Topic, TopicTranslation, Translation};
use serde_json::{Map, Value, json};

fn decode_error(entity_type: EntityType, record: &CacheRecord) -> Option<DecodeError> {
    match entity_type {
        EntityType::Topic => Topic::decode(record).err(),
        EntityType::Category => Category::decode(record).err(),
        EntityType::Tag => Tag::decode(record).err(),
        EntityType::Translation => Translation::decode(record).err(),
        EntityType::TopicTranslation => TopicTranslation::decode(record).err(),
    }
}

fn record_json(record: &CacheRecord) -> Value {
    let fields: Map<String, Value> = record
        .iter()
        .map(|(name, value)| (name.to_string(), json!(value)))
        .collect();
    Value::Object(fields)
}

fn key_list(keys: &[EntityKey]) -> Vec<String> {
    keys.iter().map(ToString::to_string).collect()
}

/// Cached record of `key` (raw fields, decode check) with its inbound and
/// cascade edges.
pub async fn get(store: &DynStore, key: EntityKey) -> Result<Value> {
    let records = RecordStore::new(store.clone());
    let graph = RelationGraph::new(store.clone());

    let record = records.get_raw(key).await?;
    let mut out = json!({
        "key": key.to_string(),
        "cached": record.is_some(),
        "back_relations": key_list(&graph.back_relations(key).await?),
        "cascade": key_list(&graph.cascade_members(key).await?),
    });
    if let Some(record) = record {
        out["fields"] = record_json(&record);
        out["decode_error"] = json!(decode_error(key.entity_type, &record).map(|e| e.to_string()));
    }
    Ok(out)
}

pub async fn count(store: &DynStore, key: EntityKey, related: Option<EntityType>) -> Result<Value> {
    let count = AccessCounter::new(store.clone()).current(key, related).await?;
    Ok(json!({
        "key": key.count_key(related).encode(),
        "count": count,
    }))
}

/// Members of the relation set, flagging ones whose record is gone.
pub async fn relations(store: &DynStore, key: EntityKey, related: EntityType) -> Result<Value> {
    let records = RecordStore::new(store.clone());
    let mut members = RelationGraph::new(store.clone())
        .members(key, related)
        .await?;
    members.sort();

    let mut rows = Vec::with_capacity(members.len());
    for member in members {
        rows.push(json!({
            "member": member.to_string(),
            "cached": records.exists(member).await?,
        }));
    }
    Ok(Value::Array(rows))
}

pub fn explain_key(raw: &str) -> Result<Value> {
    let key: CacheKey = raw.parse()?;
    let holds = match (key.relation, key.suffix) {
        (None, None) => "record hash".to_string(),
        (None, Some(KeySuffix::Count)) => "access counter".to_string(),
        (None, Some(KeySuffix::Cascade)) => "cascade set".to_string(),
        (None, Some(KeySuffix::BackRelation)) => "back-relation set".to_string(),
        (Some(related), None) => format!("relation set of {related} keys"),
        (Some(related), Some(_)) => format!("access counter of the {related} collection"),
    };
    Ok(json!({
        "key": key.encode(),
        "entity_type": key.entity.entity_type.as_str(),
        "id": key.entity.id,
        "relation": key.relation.map(|r| r.as_str()),
        "suffix": key.suffix.map(|s| s.as_str()),
        "holds": holds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizons_cache::{EntityCaches, MemoryStore};
    use std::sync::Arc;

    #[test]
    fn test_explain_key() {
        let out = explain_key("topic:1:tag:count").unwrap();
        assert_eq!(out["entity_type"], "topic");
        assert_eq!(out["relation"], "tag");
        assert_eq!(out["holds"], "access counter of the tag collection");

        assert!(explain_key("topic:one").is_err());
    }

    #[tokio::test]
    async fn test_get_reports_fields_and_edges() {
        let store: DynStore = Arc::new(MemoryStore::new());
        let caches = EntityCaches::new(store.clone());
        let tag = Tag {
            id: 7,
            name: "lore".into(),
            description: String::new(),
        };
        caches.tags.set(7, &tag).await.unwrap();
        caches.topics.add_relation(10, EntityType::Tag, 7).await.unwrap();

        let key = EntityKey::new(EntityType::Tag, 7);
        let out = get(&store, key).await.unwrap();
        assert_eq!(out["cached"], true);
        assert_eq!(out["fields"]["name"], "lore");
        assert_eq!(out["decode_error"], Value::Null);
        assert_eq!(out["back_relations"], json!(["topic:10"]));

        let rows = relations(&store, EntityKey::new(EntityType::Topic, 10), EntityType::Tag)
            .await
            .unwrap();
        assert_eq!(rows, json!([{ "member": "tag:7", "cached": true }]));
    }

    #[tokio::test]
    async fn test_count_untracked_is_null() {
        let store: DynStore = Arc::new(MemoryStore::new());
        let out = count(&store, EntityKey::new(EntityType::Topic, 42), None)
            .await
            .unwrap();
        assert_eq!(out, json!({ "key": "topic:42:count", "count": null }));
    }
}
