//! Cache-aware data access.
//!
//! ## Read path
//!
//! Every read counts an access. A cached record is served directly; on a
//! miss the row comes from the source and, once the access count has reached
//! the promotion threshold, is written to the cache. Relation reads work the
//! same way on the owner's per-relation counter and serve the cached set only
//! when every member still has a record.
//!
//! ## Write path
//!
//! The source is written first. Cached state is then patched, but only where
//! it already exists: writes never promote.
//!
//! Cache failures never fail a call. Read-path failures are logged at `warn`
//! and fall back to the source; write-path failures are logged at `error`,
//! since the cache may now serve stale data.

use horizons_cache::{
    CacheConfig, CacheEntity, CacheError, DynStore, EntityCache, EntityCaches, EntityKey,
    RelationGraph,
};
use horizons_core::{
    Category, CategoryPatch, EntityId, EntityType, NewTopic, NewTopicTranslation, Tag, TagPatch,
    Topic, TopicTranslation, Translation,
};
use std::future::Future;
use std::sync::Arc;

use crate::error::CatalogError;
use crate::source::{CatalogSource, SourceError};

/// Rows whose cached copy must die with a parent row.
///
/// Mirrors the `ON DELETE CASCADE` foreign keys of the relational schema.
pub trait CascadeParent: CacheEntity {
    fn cascade_parent(&self) -> Option<EntityKey>;
}

impl CascadeParent for Topic {
    fn cascade_parent(&self) -> Option<EntityKey> {
        Some(EntityKey::new(EntityType::Category, self.category_id))
    }
}

impl CascadeParent for TopicTranslation {
    fn cascade_parent(&self) -> Option<EntityKey> {
        Some(EntityKey::new(EntityType::Topic, self.topic_id))
    }
}

impl CascadeParent for Category {
    fn cascade_parent(&self) -> Option<EntityKey> {
        None
    }
}

impl CascadeParent for Tag {
    fn cascade_parent(&self) -> Option<EntityKey> {
        None
    }
}

impl CascadeParent for Translation {
    fn cascade_parent(&self) -> Option<EntityKey> {
        None
    }
}

fn warn_read(operation: &'static str, key: EntityKey, error: &CacheError) {
    tracing::warn!(
        operation,
        key = %key,
        error = %error,
        category = %error.category(),
        "cache read failed, falling back to source"
    );
}

fn report_write(operation: &'static str, key: EntityKey, result: Result<(), CacheError>) {
    if let Err(error) = result {
        tracing::error!(
            operation,
            key = %key,
            error = %error,
            category = %error.category(),
            "cache write-through failed, cached data may be stale"
        );
    }
}

pub struct Catalog {
    source: Arc<dyn CatalogSource>,
    caches: EntityCaches,
    graph: RelationGraph,
    policy: CacheConfig,
}

impl Catalog {
    pub fn new(source: Arc<dyn CatalogSource>, store: DynStore, policy: CacheConfig) -> Self {
        Self {
            source,
            caches: EntityCaches::new(store.clone()),
            graph: RelationGraph::new(store),
            policy,
        }
    }

    pub fn caches(&self) -> &EntityCaches {
        &self.caches
    }

    // ---- read path ----

    pub async fn topic(&self, id: EntityId) -> Result<Option<Topic>, CatalogError> {
        self.read_through(&self.caches.topics, id, self.source.topic(id))
            .await
    }

    pub async fn category(&self, id: EntityId) -> Result<Option<Category>, CatalogError> {
        self.read_through(&self.caches.categories, id, self.source.category(id))
            .await
    }

    pub async fn tag(&self, id: EntityId) -> Result<Option<Tag>, CatalogError> {
        self.read_through(&self.caches.tags, id, self.source.tag(id))
            .await
    }

    pub async fn translation(&self, id: EntityId) -> Result<Option<Translation>, CatalogError> {
        self.read_through(&self.caches.translations, id, self.source.translation(id))
            .await
    }

    pub async fn topic_translation(
        &self,
        id: EntityId,
    ) -> Result<Option<TopicTranslation>, CatalogError> {
        self.read_through(
            &self.caches.topic_translations,
            id,
            self.source.topic_translation(id),
        )
        .await
    }

    pub async fn topics_by_tag(&self, tag_id: EntityId) -> Result<Vec<Topic>, CatalogError> {
        self.read_relations(
            &self.caches.tags,
            tag_id,
            &self.caches.topics,
            false,
            self.source.topics_by_tag(tag_id),
        )
        .await
    }

    pub async fn tags_by_topic(&self, topic_id: EntityId) -> Result<Vec<Tag>, CatalogError> {
        self.read_relations(
            &self.caches.topics,
            topic_id,
            &self.caches.tags,
            false,
            self.source.tags_by_topic(topic_id),
        )
        .await
    }

    /// Topics of a category. Cached topics are owned by the category.
    pub async fn topics_by_category(&self, category_id: EntityId) -> Result<Vec<Topic>, CatalogError> {
        self.read_relations(
            &self.caches.categories,
            category_id,
            &self.caches.topics,
            true,
            self.source.topics_by_category(category_id),
        )
        .await
    }

    /// Translations of a topic. Cached translations are owned by the topic.
    pub async fn translations_by_topic(
        &self,
        topic_id: EntityId,
    ) -> Result<Vec<TopicTranslation>, CatalogError> {
        self.read_relations(
            &self.caches.topics,
            topic_id,
            &self.caches.topic_translations,
            true,
            self.source.translations_by_topic(topic_id),
        )
        .await
    }

    async fn read_through<E, F>(
        &self,
        cache: &EntityCache<E>,
        id: EntityId,
        load: F,
    ) -> Result<Option<E>, CatalogError>
    where
        E: CascadeParent,
        F: Future<Output = Result<Option<E>, SourceError>>,
    {
        let key = EntityKey::new(E::ENTITY_TYPE, id);
        let hot = match cache.incr(id, None).await {
            Ok(count) => self.policy.is_hot(count),
            Err(e) => {
                warn_read("incr", key, &e);
                false
            }
        };

        match cache.get(id).await {
            Ok(Some(cached)) => return Ok(Some(cached)),
            Ok(None) => {}
            Err(e) => warn_read("get", key, &e),
        }

        let Some(entity) = load.await? else {
            return Ok(None);
        };
        if hot {
            match self.promote(cache, &entity).await {
                Ok(()) => tracing::debug!(key = %key, "entity promoted"),
                Err(e) => warn_read("promote", key, &e),
            }
        }
        Ok(Some(entity))
    }

    async fn read_relations<O, M, F>(
        &self,
        owners: &EntityCache<O>,
        owner_id: EntityId,
        members: &EntityCache<M>,
        owned: bool,
        load: F,
    ) -> Result<Vec<M>, CatalogError>
    where
        O: CacheEntity,
        M: CascadeParent,
        F: Future<Output = Result<Vec<M>, SourceError>>,
    {
        let owner = EntityKey::new(O::ENTITY_TYPE, owner_id);
        let hot = match owners.incr(owner_id, Some(M::ENTITY_TYPE)).await {
            Ok(count) => self.policy.is_hot(count),
            Err(e) => {
                warn_read("incr", owner, &e);
                false
            }
        };

        if hot {
            match owners.load_relations::<M>(owner_id).await {
                Ok(snapshot) if !snapshot.is_empty() && snapshot.is_complete() => {
                    return Ok(snapshot.records);
                }
                Ok(_) => {}
                Err(e) => warn_read("load_relations", owner, &e),
            }
        }

        let rows = load.await?;
        if hot
            && let Err(e) = self
                .rebuild_relations(owners, owner_id, members, owned, &rows)
                .await
        {
            warn_read("cache_relations", owner, &e);
        }
        Ok(rows)
    }

    /// Replaces `owner`'s cached relation set with exactly `rows`, dropping
    /// members left dangling by an interrupted delete.
    async fn rebuild_relations<O: CacheEntity, M: CascadeParent>(
        &self,
        owners: &EntityCache<O>,
        owner_id: EntityId,
        members: &EntityCache<M>,
        owned: bool,
        rows: &[M],
    ) -> Result<(), CacheError> {
        owners.clear_relations(owner_id, M::ENTITY_TYPE).await?;
        for row in rows {
            self.cache_member(owners, owner_id, members, owned, row)
                .await?;
        }
        Ok(())
    }

    /// Caches `entity` and registers it with its cascade parent.
    async fn promote<E: CascadeParent>(
        &self,
        cache: &EntityCache<E>,
        entity: &E,
    ) -> Result<(), CacheError> {
        cache.set(entity.id(), entity).await?;
        if let Some(parent) = entity.cascade_parent() {
            self.graph.add_cascade(parent, entity.cache_key()).await?;
        }
        Ok(())
    }

    async fn cache_member<O: CacheEntity, M: CascadeParent>(
        &self,
        owners: &EntityCache<O>,
        owner_id: EntityId,
        members: &EntityCache<M>,
        owned: bool,
        member: &M,
    ) -> Result<(), CacheError> {
        self.promote(members, member).await?;
        owners.add_relation(owner_id, M::ENTITY_TYPE, member.id()).await?;
        if owned {
            owners.add_cascade(owner_id, M::ENTITY_TYPE, member.id()).await?;
        }
        Ok(())
    }

    /// Adds `member` to `owner`'s cached relation collection, if that
    /// collection is cached.
    async fn extend_cached_relation<O: CacheEntity, M: CascadeParent>(
        &self,
        owners: &EntityCache<O>,
        owner_id: EntityId,
        members: &EntityCache<M>,
        owned: bool,
        member: &M,
    ) -> Result<(), CacheError> {
        if owners.exists(owner_id, Some(M::ENTITY_TYPE)).await? {
            self.cache_member(owners, owner_id, members, owned, member)
                .await?;
        }
        Ok(())
    }

    // ---- write path ----

    pub async fn create_topic(&self, topic: NewTopic) -> Result<Topic, CatalogError> {
        let created = self.source.insert_topic(topic).await?;
        tracing::info!(topic_id = created.id, category_id = created.category_id, "topic created");

        report_write(
            "create_topic",
            created.cache_key(),
            self.extend_cached_relation(
                &self.caches.categories,
                created.category_id,
                &self.caches.topics,
                true,
                &created,
            )
            .await,
        );
        Ok(created)
    }

    pub async fn rename_topic(&self, id: EntityId, name: &str) -> Result<Topic, CatalogError> {
        let topic = self
            .source
            .rename_topic(id, name)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityType::Topic, id))?;

        report_write(
            "rename_topic",
            topic.cache_key(),
            self.refresh_cached(&self.caches.topics, &topic).await,
        );
        Ok(topic)
    }

    /// Returns `false` if the topic did not exist.
    pub async fn delete_topic(&self, id: EntityId) -> Result<bool, CatalogError> {
        let deleted = self.source.delete_topic(id).await?;
        report_write(
            "delete_topic",
            EntityKey::new(EntityType::Topic, id),
            self.caches.topics.delete(id).await.map(drop),
        );
        Ok(deleted)
    }

    /// Applies `patch` to a tag. An empty patch leaves the tag untouched.
    pub async fn edit_tag(&self, id: EntityId, patch: &TagPatch) -> Result<Tag, CatalogError> {
        if patch.is_empty() {
            return self
                .source
                .tag(id)
                .await?
                .ok_or_else(|| CatalogError::not_found(EntityType::Tag, id));
        }

        let tag = self
            .source
            .update_tag(id, patch)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityType::Tag, id))?;

        report_write(
            "edit_tag",
            tag.cache_key(),
            self.refresh_cached(&self.caches.tags, &tag).await,
        );
        Ok(tag)
    }

    pub async fn delete_tag(&self, id: EntityId) -> Result<bool, CatalogError> {
        let deleted = self.source.delete_tag(id).await?;
        report_write(
            "delete_tag",
            EntityKey::new(EntityType::Tag, id),
            self.caches.tags.delete(id).await.map(drop),
        );
        Ok(deleted)
    }

    /// Links a tag to a topic. Returns `false` if they were already linked.
    pub async fn attach_tag(&self, topic_id: EntityId, tag_id: EntityId) -> Result<bool, CatalogError> {
        let tag = self
            .tag(tag_id)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityType::Tag, tag_id))?;

        let linked = self.source.link_tag(topic_id, tag_id).await?;
        report_write(
            "attach_tag",
            EntityKey::new(EntityType::Topic, topic_id),
            self.cache_link(topic_id, &tag).await,
        );
        Ok(linked)
    }

    async fn cache_link(&self, topic_id: EntityId, tag: &Tag) -> Result<(), CacheError> {
        self.extend_cached_relation(&self.caches.topics, topic_id, &self.caches.tags, false, tag)
            .await?;

        let tags = &self.caches.tags;
        if tags.exists(tag.id, Some(EntityType::Topic)).await? {
            if self.caches.topics.exists(topic_id, None).await? {
                tags.add_relation(tag.id, EntityType::Topic, topic_id).await?;
            } else {
                // Rebuilt from the source on the next hot read.
                tags.clear_relations(tag.id, EntityType::Topic).await?;
            }
        }
        Ok(())
    }

    /// Unlinks a tag from a topic. Returns `false` if they were not linked.
    pub async fn detach_tag(&self, topic_id: EntityId, tag_id: EntityId) -> Result<bool, CatalogError> {
        self.tag(tag_id)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityType::Tag, tag_id))?;

        let unlinked = self.source.unlink_tag(topic_id, tag_id).await?;
        report_write(
            "detach_tag",
            EntityKey::new(EntityType::Topic, topic_id),
            self.cache_unlink(topic_id, tag_id).await,
        );
        Ok(unlinked)
    }

    async fn cache_unlink(&self, topic_id: EntityId, tag_id: EntityId) -> Result<(), CacheError> {
        let topics = &self.caches.topics;
        let tags = &self.caches.tags;
        topics.delete_relation(topic_id, EntityType::Tag, tag_id).await?;
        tags.delete_back_relation(tag_id, EntityType::Topic, topic_id).await?;
        tags.delete_relation(tag_id, EntityType::Topic, topic_id).await?;
        topics.delete_back_relation(topic_id, EntityType::Tag, tag_id).await?;
        Ok(())
    }

    pub async fn update_category(
        &self,
        id: EntityId,
        patch: &CategoryPatch,
    ) -> Result<Category, CatalogError> {
        if patch.is_empty() {
            return self
                .source
                .category(id)
                .await?
                .ok_or_else(|| CatalogError::not_found(EntityType::Category, id));
        }

        let category = self
            .source
            .update_category(id, patch)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityType::Category, id))?;

        report_write(
            "update_category",
            category.cache_key(),
            self.refresh_cached(&self.caches.categories, &category).await,
        );
        Ok(category)
    }

    /// Deletes a category and, with it, its topics.
    pub async fn delete_category(&self, id: EntityId) -> Result<bool, CatalogError> {
        let deleted = self.source.delete_category(id).await?;
        report_write(
            "delete_category",
            EntityKey::new(EntityType::Category, id),
            self.caches.categories.delete(id).await.map(drop),
        );
        Ok(deleted)
    }

    pub async fn add_topic_translation(
        &self,
        translation: NewTopicTranslation,
    ) -> Result<TopicTranslation, CatalogError> {
        let created = self.source.insert_topic_translation(translation).await?;
        tracing::info!(
            topic_translation_id = created.id,
            topic_id = created.topic_id,
            "topic translation added"
        );

        report_write(
            "add_topic_translation",
            created.cache_key(),
            self.extend_cached_relation(
                &self.caches.topics,
                created.topic_id,
                &self.caches.topic_translations,
                true,
                &created,
            )
            .await,
        );
        Ok(created)
    }

    pub async fn delete_topic_translation(&self, id: EntityId) -> Result<bool, CatalogError> {
        let deleted = self.source.delete_topic_translation(id).await?;
        report_write(
            "delete_topic_translation",
            EntityKey::new(EntityType::TopicTranslation, id),
            self.caches.topic_translations.delete(id).await.map(drop),
        );
        Ok(deleted)
    }

    /// Overwrites the cached record of `entity`, if there is one.
    async fn refresh_cached<E: CacheEntity>(
        &self,
        cache: &EntityCache<E>,
        entity: &E,
    ) -> Result<(), CacheError> {
        if cache.exists(entity.id(), None).await? {
            cache.set(entity.id(), entity).await?;
        }
        Ok(())
    }
}
