//! In-memory [`CatalogSource`] with relational semantics.
//!
//! Unique columns, foreign keys and `ON DELETE CASCADE` behave like the
//! relational schema, so the catalog's cache maintenance can be exercised
//! without a database. Every read is counted; tests use [`InMemorySource::loads`]
//! to tell cache hits from source reads.

use async_trait::async_trait;
use horizons_core::{
    Category, CategoryPatch, DisplayMode, EntityId, EntityType, NewTopic, NewTopicTranslation,
    ParseMode, Tag, TagPatch, Topic, TopicTranslation, Translation,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::source::{CatalogSource, SourceError};

#[derive(Debug, Clone)]
struct TopicTranslationRow {
    id: EntityId,
    translation_id: EntityId,
    topic_id: EntityId,
    parse_mode: ParseMode,
    text: String,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: EntityId,
    topics: BTreeMap<EntityId, Topic>,
    categories: BTreeMap<EntityId, Category>,
    tags: BTreeMap<EntityId, Tag>,
    translations: BTreeMap<EntityId, Translation>,
    topic_translations: BTreeMap<EntityId, TopicTranslationRow>,
    /// `(topic_id, tag_id)`
    tag_in_topic: BTreeSet<(EntityId, EntityId)>,
}

impl Tables {
    fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }

    fn joined(&self, row: &TopicTranslationRow) -> Result<TopicTranslation, SourceError> {
        let translation = self.translations.get(&row.translation_id).ok_or_else(|| {
            SourceError::internal(format!(
                "topic translation {} points at missing translation {}",
                row.id, row.translation_id
            ))
        })?;
        Ok(TopicTranslation {
            id: row.id,
            translation_code: translation.translation_code.clone(),
            topic_id: row.topic_id,
            parse_mode: row.parse_mode,
            text: row.text.clone(),
            full_name: translation.full_name.clone(),
        })
    }

    fn remove_topic(&mut self, id: EntityId) -> bool {
        if self.topics.remove(&id).is_none() {
            return false;
        }
        self.topic_translations.retain(|_, row| row.topic_id != id);
        self.tag_in_topic.retain(|(topic_id, _)| *topic_id != id);
        true
    }
}

#[derive(Debug, Default)]
pub struct InMemorySource {
    tables: RwLock<Tables>,
    loads: AtomicU64,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read queries served so far.
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }

    fn count_load(&self) {
        self.loads.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn insert_category(
        &self,
        name: &str,
        description: &str,
        display_mode: DisplayMode,
    ) -> Result<Category, SourceError> {
        let mut tables = self.tables.write().await;
        if tables.categories.values().any(|c| c.name == name) {
            return Err(SourceError::conflict(EntityType::Category, "name", name));
        }
        let category = Category {
            id: tables.allocate_id(),
            name: name.to_string(),
            description: description.to_string(),
            display_mode,
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    pub async fn insert_tag(&self, name: &str, description: &str) -> Result<Tag, SourceError> {
        let mut tables = self.tables.write().await;
        if tables.tags.values().any(|t| t.name == name) {
            return Err(SourceError::conflict(EntityType::Tag, "name", name));
        }
        let tag = Tag {
            id: tables.allocate_id(),
            name: name.to_string(),
            description: description.to_string(),
        };
        tables.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    pub async fn insert_translation(
        &self,
        translation_code: &str,
        full_name: &str,
    ) -> Result<Translation, SourceError> {
        let mut tables = self.tables.write().await;
        if tables
            .translations
            .values()
            .any(|t| t.translation_code == translation_code)
        {
            return Err(SourceError::conflict(
                EntityType::Translation,
                "translation_code",
                translation_code,
            ));
        }
        let translation = Translation {
            id: tables.allocate_id(),
            translation_code: translation_code.to_string(),
            full_name: full_name.to_string(),
        };
        tables.translations.insert(translation.id, translation.clone());
        Ok(translation)
    }
}

#[async_trait]
impl CatalogSource for InMemorySource {
    async fn topic(&self, id: EntityId) -> Result<Option<Topic>, SourceError> {
        self.count_load();
        Ok(self.tables.read().await.topics.get(&id).cloned())
    }

    async fn category(&self, id: EntityId) -> Result<Option<Category>, SourceError> {
        self.count_load();
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn tag(&self, id: EntityId) -> Result<Option<Tag>, SourceError> {
        self.count_load();
        Ok(self.tables.read().await.tags.get(&id).cloned())
    }

    async fn translation(&self, id: EntityId) -> Result<Option<Translation>, SourceError> {
        self.count_load();
        Ok(self.tables.read().await.translations.get(&id).cloned())
    }

    async fn topic_translation(&self, id: EntityId) -> Result<Option<TopicTranslation>, SourceError> {
        self.count_load();
        let tables = self.tables.read().await;
        tables
            .topic_translations
            .get(&id)
            .map(|row| tables.joined(row))
            .transpose()
    }

    async fn topics_by_tag(&self, tag_id: EntityId) -> Result<Vec<Topic>, SourceError> {
        self.count_load();
        let tables = self.tables.read().await;
        Ok(tables
            .tag_in_topic
            .iter()
            .filter(|(_, tag)| *tag == tag_id)
            .filter_map(|(topic, _)| tables.topics.get(topic).cloned())
            .collect())
    }

    async fn tags_by_topic(&self, topic_id: EntityId) -> Result<Vec<Tag>, SourceError> {
        self.count_load();
        let tables = self.tables.read().await;
        Ok(tables
            .tag_in_topic
            .iter()
            .filter(|(topic, _)| *topic == topic_id)
            .filter_map(|(_, tag)| tables.tags.get(tag).cloned())
            .collect())
    }

    async fn topics_by_category(&self, category_id: EntityId) -> Result<Vec<Topic>, SourceError> {
        self.count_load();
        let tables = self.tables.read().await;
        Ok(tables
            .topics
            .values()
            .filter(|t| t.category_id == category_id)
            .cloned()
            .collect())
    }

    async fn translations_by_topic(
        &self,
        topic_id: EntityId,
    ) -> Result<Vec<TopicTranslation>, SourceError> {
        self.count_load();
        let tables = self.tables.read().await;
        tables
            .topic_translations
            .values()
            .filter(|row| row.topic_id == topic_id)
            .map(|row| tables.joined(row))
            .collect()
    }

    async fn insert_topic(&self, topic: NewTopic) -> Result<Topic, SourceError> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&topic.category_id) {
            return Err(SourceError::missing_reference(
                EntityType::Category,
                topic.category_id,
            ));
        }
        if tables.topics.values().any(|t| t.name == topic.name) {
            return Err(SourceError::conflict(EntityType::Topic, "name", topic.name));
        }
        let now = OffsetDateTime::now_utc();
        let row = Topic {
            id: tables.allocate_id(),
            name: topic.name,
            created_at: now,
            edited_at: now,
            creator_user_id: topic.creator_user_id,
            cover_image_id: topic.cover_image_id,
            category_id: topic.category_id,
        };
        tables.topics.insert(row.id, row.clone());
        Ok(row)
    }

    async fn rename_topic(&self, id: EntityId, name: &str) -> Result<Option<Topic>, SourceError> {
        let mut tables = self.tables.write().await;
        if tables.topics.values().any(|t| t.name == name && t.id != id) {
            return Err(SourceError::conflict(EntityType::Topic, "name", name));
        }
        let Some(topic) = tables.topics.get_mut(&id) else {
            return Ok(None);
        };
        topic.name = name.to_string();
        topic.edited_at = OffsetDateTime::now_utc();
        Ok(Some(topic.clone()))
    }

    async fn delete_topic(&self, id: EntityId) -> Result<bool, SourceError> {
        Ok(self.tables.write().await.remove_topic(id))
    }

    async fn update_tag(&self, id: EntityId, patch: &TagPatch) -> Result<Option<Tag>, SourceError> {
        let mut tables = self.tables.write().await;
        if !tables.tags.contains_key(&id) {
            return Ok(None);
        }
        if let Some(name) = &patch.name
            && tables.tags.values().any(|t| &t.name == name && t.id != id)
        {
            return Err(SourceError::conflict(EntityType::Tag, "name", name.as_str()));
        }
        let Some(tag) = tables.tags.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(tag);
        Ok(Some(tag.clone()))
    }

    async fn delete_tag(&self, id: EntityId) -> Result<bool, SourceError> {
        let mut tables = self.tables.write().await;
        if tables.tags.remove(&id).is_none() {
            return Ok(false);
        }
        tables.tag_in_topic.retain(|(_, tag)| *tag != id);
        Ok(true)
    }

    async fn link_tag(&self, topic_id: EntityId, tag_id: EntityId) -> Result<bool, SourceError> {
        let mut tables = self.tables.write().await;
        if !tables.topics.contains_key(&topic_id) {
            return Err(SourceError::missing_reference(EntityType::Topic, topic_id));
        }
        if !tables.tags.contains_key(&tag_id) {
            return Err(SourceError::missing_reference(EntityType::Tag, tag_id));
        }
        Ok(tables.tag_in_topic.insert((topic_id, tag_id)))
    }

    async fn unlink_tag(&self, topic_id: EntityId, tag_id: EntityId) -> Result<bool, SourceError> {
        Ok(self
            .tables
            .write()
            .await
            .tag_in_topic
            .remove(&(topic_id, tag_id)))
    }

    async fn update_category(
        &self,
        id: EntityId,
        patch: &CategoryPatch,
    ) -> Result<Option<Category>, SourceError> {
        let mut tables = self.tables.write().await;
        let Some(category) = tables.categories.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(category);
        Ok(Some(category.clone()))
    }

    async fn delete_category(&self, id: EntityId) -> Result<bool, SourceError> {
        let mut tables = self.tables.write().await;
        if tables.categories.remove(&id).is_none() {
            return Ok(false);
        }
        let topics: Vec<EntityId> = tables
            .topics
            .values()
            .filter(|t| t.category_id == id)
            .map(|t| t.id)
            .collect();
        for topic in topics {
            tables.remove_topic(topic);
        }
        Ok(true)
    }

    async fn insert_topic_translation(
        &self,
        translation: NewTopicTranslation,
    ) -> Result<TopicTranslation, SourceError> {
        let mut tables = self.tables.write().await;
        if !tables.topics.contains_key(&translation.topic_id) {
            return Err(SourceError::missing_reference(
                EntityType::Topic,
                translation.topic_id,
            ));
        }
        if !tables.translations.contains_key(&translation.translation_id) {
            return Err(SourceError::missing_reference(
                EntityType::Translation,
                translation.translation_id,
            ));
        }
        let row = TopicTranslationRow {
            id: tables.allocate_id(),
            translation_id: translation.translation_id,
            topic_id: translation.topic_id,
            parse_mode: translation.parse_mode,
            text: translation.text,
        };
        let joined = tables.joined(&row)?;
        tables.topic_translations.insert(row.id, row);
        Ok(joined)
    }

    async fn delete_topic_translation(&self, id: EntityId) -> Result<bool, SourceError> {
        Ok(self
            .tables
            .write()
            .await
            .topic_translations
            .remove(&id)
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (InMemorySource, Category, Topic) {
        let source = InMemorySource::new();
        let category = source
            .insert_category("lore", "world building", DisplayMode::Wiki)
            .await
            .unwrap();
        let topic = source
            .insert_topic(NewTopic {
                name: "Wars".into(),
                category_id: category.id,
                creator_user_id: None,
                cover_image_id: None,
            })
            .await
            .unwrap();
        (source, category, topic)
    }

    #[tokio::test]
    async fn test_unique_names() {
        let source = InMemorySource::new();
        source.insert_tag("lore", "").await.unwrap();
        let err = source.insert_tag("lore", "again").await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_topic_requires_category() {
        let source = InMemorySource::new();
        let err = source
            .insert_topic(NewTopic {
                name: "Orphan".into(),
                category_id: 99,
                creator_user_id: None,
                cover_image_id: None,
            })
            .await
            .unwrap_err();
        assert!(err.is_missing_reference());
    }

    #[tokio::test]
    async fn test_category_delete_cascades() {
        let (source, category, topic) = seeded().await;
        let tag = source.insert_tag("maps", "").await.unwrap();
        let english = source.insert_translation("en", "English").await.unwrap();
        source.link_tag(topic.id, tag.id).await.unwrap();
        let translation = source
            .insert_topic_translation(NewTopicTranslation {
                topic_id: topic.id,
                translation_id: english.id,
                parse_mode: ParseMode::Markdown,
                text: "# Wars".into(),
            })
            .await
            .unwrap();
        assert_eq!(translation.translation_code, "en");

        assert!(source.delete_category(category.id).await.unwrap());

        assert!(source.topic(topic.id).await.unwrap().is_none());
        assert!(source.topic_translation(translation.id).await.unwrap().is_none());
        assert!(source.topics_by_tag(tag.id).await.unwrap().is_empty());
        assert!(source.tag(tag.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_link_tag_is_idempotent() {
        let (source, _, topic) = seeded().await;
        let tag = source.insert_tag("maps", "").await.unwrap();

        assert!(source.link_tag(topic.id, tag.id).await.unwrap());
        assert!(!source.link_tag(topic.id, tag.id).await.unwrap());
        assert_eq!(source.tags_by_topic(topic.id).await.unwrap(), vec![tag]);
    }

    #[tokio::test]
    async fn test_reads_are_counted() {
        let (source, _, topic) = seeded().await;
        assert_eq!(source.loads(), 0);
        source.topic(topic.id).await.unwrap();
        source.tags_by_topic(topic.id).await.unwrap();
        assert_eq!(source.loads(), 2);
    }
}
