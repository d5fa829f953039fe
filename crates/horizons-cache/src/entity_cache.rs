//! Per-entity-type cache facade.
//!
//! ## Lifecycle
//!
//! ```text
//! Untracked --incr--> Counting --set (caller saw count >= threshold)--> Cached
//!     ^                                                                   |
//!     +----------------------------- delete ------------------------------+
//! ```
//!
//! The cache never promotes on its own: callers compare the value returned
//! by [`EntityCache::incr`] with the configured threshold and call
//! [`EntityCache::set`] themselves. `set` on a cached key replaces the
//! record and leaves its edges alone.

use horizons_core::{
    Category, EntityId, EntityType, Tag, Topic, TopicTranslation, Translation,
};
use std::marker::PhantomData;

use crate::counter::AccessCounter;
use crate::error::CacheError;
use crate::graph::{RelationGraph, RelationSnapshot};
use crate::key::EntityKey;
use crate::record::{CacheEntity, RecordStore};
use crate::store::DynStore;

pub struct EntityCache<E> {
    store: DynStore,
    counter: AccessCounter,
    records: RecordStore,
    graph: RelationGraph,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityCache<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            counter: self.counter.clone(),
            records: self.records.clone(),
            graph: self.graph.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: CacheEntity> EntityCache<E> {
    pub fn new(store: DynStore) -> Self {
        Self {
            counter: AccessCounter::new(store.clone()),
            records: RecordStore::new(store.clone()),
            graph: RelationGraph::new(store.clone()),
            store,
            _entity: PhantomData,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        E::ENTITY_TYPE
    }

    fn key(id: EntityId) -> EntityKey {
        EntityKey::new(E::ENTITY_TYPE, id)
    }

    /// Counts one access to the entity, or to its `related` collection, and
    /// returns the new total.
    pub async fn incr(&self, id: EntityId, related: Option<EntityType>) -> Result<i64, CacheError> {
        self.counter.incr(Self::key(id), related).await
    }

    /// Access count without counting.
    pub async fn count(&self, id: EntityId, related: Option<EntityType>) -> Result<Option<i64>, CacheError> {
        self.counter.current(Self::key(id), related).await
    }

    /// Whether the record is cached, or with `related`, whether the
    /// entity's relation set for that type is.
    pub async fn exists(&self, id: EntityId, related: Option<EntityType>) -> Result<bool, CacheError> {
        let key = Self::key(id);
        match related {
            None => self.records.exists(key).await,
            Some(related) => self.store.exists(&key.relation_key(related).encode()).await,
        }
    }

    pub async fn get(&self, id: EntityId) -> Result<Option<E>, CacheError> {
        let key = Self::key(id);
        let entity = self.records.get::<E>(key).await?;
        tracing::debug!(key = %key, hit = entity.is_some(), "cache lookup");
        Ok(entity)
    }

    /// Caches the full snapshot of `entity` under `id`, replacing any
    /// existing record.
    pub async fn set(&self, id: EntityId, entity: &E) -> Result<(), CacheError> {
        let key = Self::key(id);
        if entity.id() != id {
            tracing::warn!(key = %key, entity_id = entity.id(), "caching entity under a different id");
        }
        self.records.set(key, entity).await?;
        tracing::debug!(key = %key, "record cached");
        Ok(())
    }

    /// Removes the entity, its derived keys and its cascade closure, and
    /// unhooks it from the relation sets of its owners. Safe to call on keys
    /// that were never cached. Returns the number of entities purged.
    pub async fn delete(&self, id: EntityId) -> Result<usize, CacheError> {
        let purged = self.graph.purge(Self::key(id)).await?;
        tracing::debug!(key = %Self::key(id), purged, "cache entry deleted");
        Ok(purged)
    }

    /// Links `member_id` of type `related` into this entity's relation set
    /// and records the inverse edge on the member.
    pub async fn add_relation(
        &self,
        id: EntityId,
        related: EntityType,
        member_id: EntityId,
    ) -> Result<(), CacheError> {
        self.graph
            .add_relation(Self::key(id), EntityKey::new(related, member_id))
            .await
    }

    /// Removes `member_id` from this entity's relation set for `related`.
    /// The member's back-relation is left to [`Self::delete_back_relation`].
    pub async fn delete_relation(
        &self,
        id: EntityId,
        related: EntityType,
        member_id: EntityId,
    ) -> Result<bool, CacheError> {
        self.graph
            .delete_relation(Self::key(id), EntityKey::new(related, member_id))
            .await
    }

    /// Forgets the cached relation collection for `related`.
    pub async fn clear_relations(&self, id: EntityId, related: EntityType) -> Result<(), CacheError> {
        self.graph.clear_relations(Self::key(id), related).await
    }

    /// Records that `owner_id` of type `owner_type` lists this entity.
    pub async fn add_back_relation(
        &self,
        id: EntityId,
        owner_type: EntityType,
        owner_id: EntityId,
    ) -> Result<bool, CacheError> {
        self.graph
            .link_back(Self::key(id), EntityKey::new(owner_type, owner_id))
            .await
    }

    pub async fn delete_back_relation(
        &self,
        id: EntityId,
        owner_type: EntityType,
        owner_id: EntityId,
    ) -> Result<bool, CacheError> {
        self.graph
            .delete_back_relation(Self::key(id), EntityKey::new(owner_type, owner_id))
            .await
    }

    /// Makes the cached copy of `member_id` die with this entity.
    pub async fn add_cascade(
        &self,
        id: EntityId,
        member_type: EntityType,
        member_id: EntityId,
    ) -> Result<bool, CacheError> {
        self.graph
            .add_cascade(Self::key(id), EntityKey::new(member_type, member_id))
            .await
    }

    /// Cached records of type `R` related to this entity. Members whose
    /// record has been evicted are omitted.
    pub async fn get_relations<R: CacheEntity>(&self, id: EntityId) -> Result<Vec<R>, CacheError> {
        Ok(self.load_relations::<R>(id).await?.records)
    }

    pub async fn load_relations<R: CacheEntity>(
        &self,
        id: EntityId,
    ) -> Result<RelationSnapshot<R>, CacheError> {
        self.graph.load_relations::<R>(Self::key(id)).await
    }

    /// Raw member keys of the relation set for `related`.
    pub async fn relation_members(
        &self,
        id: EntityId,
        related: EntityType,
    ) -> Result<Vec<EntityKey>, CacheError> {
        self.graph.members(Self::key(id), related).await
    }

    /// Owners whose relation sets list this entity.
    pub async fn back_relations(&self, id: EntityId) -> Result<Vec<EntityKey>, CacheError> {
        self.graph.back_relations(Self::key(id)).await
    }
}

/// One [`EntityCache`] per entity type over a shared store.
#[derive(Clone)]
pub struct EntityCaches {
    pub topics: EntityCache<Topic>,
    pub categories: EntityCache<Category>,
    pub tags: EntityCache<Tag>,
    pub translations: EntityCache<Translation>,
    pub topic_translations: EntityCache<TopicTranslation>,
    store: DynStore,
}

impl EntityCaches {
    pub fn new(store: DynStore) -> Self {
        Self {
            topics: EntityCache::new(store.clone()),
            categories: EntityCache::new(store.clone()),
            tags: EntityCache::new(store.clone()),
            translations: EntityCache::new(store.clone()),
            topic_translations: EntityCache::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &DynStore {
        &self.store
    }

    /// Deletes any entity by key, whatever its type.
    pub async fn delete(&self, key: EntityKey) -> Result<usize, CacheError> {
        match key.entity_type {
            EntityType::Topic => self.topics.delete(key.id).await,
            EntityType::Category => self.categories.delete(key.id).await,
            EntityType::Tag => self.tags.delete(key.id).await,
            EntityType::Translation => self.translations.delete(key.id).await,
            EntityType::TopicTranslation => self.topic_translations.delete(key.id).await,
        }
    }
}
