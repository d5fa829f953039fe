//! Authoritative store abstraction.
//!
//! The relational store is the source of truth; the cache is rebuilt from it.
//! Every write goes here first.

use async_trait::async_trait;
use horizons_core::{
    Category, CategoryPatch, EntityId, EntityType, NewTopic, NewTopicTranslation, Tag, TagPatch,
    Topic, TopicTranslation, Translation,
};
use std::fmt;

/// Errors raised by the authoritative store.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A unique column already holds this value.
    #[error("{entity_type} with {field} {value:?} already exists")]
    Conflict {
        entity_type: EntityType,
        field: &'static str,
        value: String,
    },

    /// A referenced row does not exist.
    #[error("Referenced {entity_type} {id} does not exist")]
    MissingReference { entity_type: EntityType, id: EntityId },

    /// Failed to reach the store.
    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SourceError {
    #[must_use]
    pub fn conflict(entity_type: EntityType, field: &'static str, value: impl Into<String>) -> Self {
        Self::Conflict {
            entity_type,
            field,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn missing_reference(entity_type: EntityType, id: EntityId) -> Self {
        Self::MissingReference { entity_type, id }
    }

    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the write violated a uniqueness constraint.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns `true` if the write referenced a missing row.
    #[must_use]
    pub fn is_missing_reference(&self) -> bool {
        matches!(self, Self::MissingReference { .. })
    }

    #[must_use]
    pub fn category(&self) -> SourceErrorCategory {
        match self {
            Self::Conflict { .. } => SourceErrorCategory::Conflict,
            Self::MissingReference { .. } => SourceErrorCategory::Validation,
            Self::Connection { .. } => SourceErrorCategory::Infrastructure,
            Self::Internal { .. } => SourceErrorCategory::Internal,
        }
    }
}

/// Categories of source errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceErrorCategory {
    Conflict,
    Validation,
    Infrastructure,
    Internal,
}

impl fmt::Display for SourceErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Relational store holding the catalog rows.
///
/// Lookups return `Ok(None)` for missing rows. Writes that target a missing
/// row return `Ok(None)`/`Ok(false)`; writes that reference a missing row
/// fail with [`SourceError::MissingReference`]. Deleting a row removes
/// everything that references it (topics of a category, translations of a
/// topic, tag links).
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn topic(&self, id: EntityId) -> Result<Option<Topic>, SourceError>;

    async fn category(&self, id: EntityId) -> Result<Option<Category>, SourceError>;

    async fn tag(&self, id: EntityId) -> Result<Option<Tag>, SourceError>;

    async fn translation(&self, id: EntityId) -> Result<Option<Translation>, SourceError>;

    async fn topic_translation(&self, id: EntityId) -> Result<Option<TopicTranslation>, SourceError>;

    async fn topics_by_tag(&self, tag_id: EntityId) -> Result<Vec<Topic>, SourceError>;

    async fn tags_by_topic(&self, topic_id: EntityId) -> Result<Vec<Tag>, SourceError>;

    async fn topics_by_category(&self, category_id: EntityId) -> Result<Vec<Topic>, SourceError>;

    async fn translations_by_topic(
        &self,
        topic_id: EntityId,
    ) -> Result<Vec<TopicTranslation>, SourceError>;

    async fn insert_topic(&self, topic: NewTopic) -> Result<Topic, SourceError>;

    /// Renames a topic and bumps its edit time.
    async fn rename_topic(&self, id: EntityId, name: &str) -> Result<Option<Topic>, SourceError>;

    async fn delete_topic(&self, id: EntityId) -> Result<bool, SourceError>;

    async fn update_tag(&self, id: EntityId, patch: &TagPatch) -> Result<Option<Tag>, SourceError>;

    async fn delete_tag(&self, id: EntityId) -> Result<bool, SourceError>;

    /// Links a tag to a topic. Returns `false` if the link already existed.
    async fn link_tag(&self, topic_id: EntityId, tag_id: EntityId) -> Result<bool, SourceError>;

    /// Returns `false` if there was no link.
    async fn unlink_tag(&self, topic_id: EntityId, tag_id: EntityId) -> Result<bool, SourceError>;

    async fn update_category(
        &self,
        id: EntityId,
        patch: &CategoryPatch,
    ) -> Result<Option<Category>, SourceError>;

    async fn delete_category(&self, id: EntityId) -> Result<bool, SourceError>;

    async fn insert_topic_translation(
        &self,
        translation: NewTopicTranslation,
    ) -> Result<TopicTranslation, SourceError>;

    async fn delete_topic_translation(&self, id: EntityId) -> Result<bool, SourceError>;
}
