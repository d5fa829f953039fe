use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Primary key of a cached row. Rows use serial integer ids.
pub type EntityId = i64;

/// Closed set of row kinds the cache knows about.
///
/// The textual names double as key namespaces (`topic:42`), so they must
/// never contain the key separator and must stay distinct from the key
/// suffixes (`count`, `cascade`, `back-relation`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityType {
    Topic,
    Category,
    Tag,
    Translation,
    TopicTranslation,
}

impl EntityType {
    /// Every variant, in declaration order.
    pub const ALL: [EntityType; 5] = [
        EntityType::Topic,
        EntityType::Category,
        EntityType::Tag,
        EntityType::Translation,
        EntityType::TopicTranslation,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityType::Topic => "topic",
            EntityType::Category => "category",
            EntityType::Tag => "tag",
            EntityType::Translation => "translation",
            EntityType::TopicTranslation => "topic-translation",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "topic" => Ok(EntityType::Topic),
            "category" => Ok(EntityType::Category),
            "tag" => Ok(EntityType::Tag),
            "translation" => Ok(EntityType::Translation),
            "topic-translation" => Ok(EntityType::TopicTranslation),
            other => Err(CoreError::unknown_entity_type(other)),
        }
    }
}
