//! Row snapshots of the authoritative schema.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::entity::EntityId;
use crate::error::CoreError;

/// How a category lays out its topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DisplayMode {
    #[default]
    Standard,
    Wiki,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayMode::Standard => write!(f, "Standard"),
            DisplayMode::Wiki => write!(f, "Wiki"),
        }
    }
}

impl FromStr for DisplayMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Standard" => Ok(DisplayMode::Standard),
            "Wiki" => Ok(DisplayMode::Wiki),
            other => Err(CoreError::unknown_variant("display mode", other)),
        }
    }
}

/// Markup dialect of a topic translation body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseMode {
    Markdown,
    #[serde(rename = "BBCode")]
    BbCode,
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseMode::Markdown => write!(f, "Markdown"),
            ParseMode::BbCode => write!(f, "BBCode"),
        }
    }
}

impl FromStr for ParseMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Markdown" => Ok(ParseMode::Markdown),
            "BBCode" => Ok(ParseMode::BbCode),
            other => Err(CoreError::unknown_variant("parse mode", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: EntityId,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub edited_at: OffsetDateTime,
    pub creator_user_id: Option<Uuid>,
    pub cover_image_id: Option<EntityId>,
    pub category_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub display_mode: DisplayMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: EntityId,
    pub name: String,
    pub description: String,
}

/// A language a topic can be translated into (`en`, `ja`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub id: EntityId,
    pub translation_code: String,
    pub full_name: String,
}

/// Body of a topic in one language, denormalized with its language code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicTranslation {
    pub id: EntityId,
    pub translation_code: String,
    pub topic_id: EntityId,
    pub parse_mode: ParseMode,
    pub text: String,
    pub full_name: String,
}

/// Insert payload for a topic; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTopic {
    pub name: String,
    pub category_id: EntityId,
    pub creator_user_id: Option<Uuid>,
    pub cover_image_id: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTopicTranslation {
    pub topic_id: EntityId,
    pub translation_id: EntityId,
    pub parse_mode: ParseMode,
    pub text: String,
}

/// Partial update for a tag. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl TagPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }

    /// Applies the set fields to `tag`.
    pub fn apply(&self, tag: &mut Tag) {
        if let Some(name) = &self.name {
            tag.name = name.clone();
        }
        if let Some(description) = &self.description {
            tag.description = description.clone();
        }
    }
}

/// Partial update for a category. The name is immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPatch {
    pub description: Option<String>,
    pub display_mode: Option<DisplayMode>,
}

impl CategoryPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.display_mode.is_none()
    }

    pub fn apply(&self, category: &mut Category) {
        if let Some(description) = &self.description {
            category.description = description.clone();
        }
        if let Some(mode) = self.display_mode {
            category.display_mode = mode;
        }
    }
}
