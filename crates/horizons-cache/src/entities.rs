//! [`CacheEntity`] implementations for the domain rows.
//!
//! Timestamps are stored as Unix nanoseconds, which round-trips every
//! representable instant exactly.

use horizons_core::{Category, EntityId, EntityType, Tag, Topic, TopicTranslation, Translation};
use time::OffsetDateTime;

use crate::error::DecodeError;
use crate::record::{CacheEntity, CacheRecord};

fn timestamp(record: &CacheRecord, field: &'static str) -> Result<OffsetDateTime, DecodeError> {
    record.required_with(field, |raw| {
        let nanos: i128 = raw.parse().map_err(|e: std::num::ParseIntError| e.to_string())?;
        OffsetDateTime::from_unix_timestamp_nanos(nanos).map_err(|e| e.to_string())
    })
}

impl CacheEntity for Topic {
    const ENTITY_TYPE: EntityType = EntityType::Topic;

    fn id(&self) -> EntityId {
        self.id
    }

    fn encode(&self) -> CacheRecord {
        CacheRecord::new()
            .with("id", self.id)
            .with("name", &self.name)
            .with("created_at", self.created_at.unix_timestamp_nanos())
            .with("edited_at", self.edited_at.unix_timestamp_nanos())
            .with_optional("creator_user_id", self.creator_user_id)
            .with_optional("cover_image_id", self.cover_image_id)
            .with("category_id", self.category_id)
    }

    fn decode(record: &CacheRecord) -> Result<Self, DecodeError> {
        Ok(Topic {
            id: record.required("id")?,
            name: record.required("name")?,
            created_at: timestamp(record, "created_at")?,
            edited_at: timestamp(record, "edited_at")?,
            creator_user_id: record.optional("creator_user_id")?,
            cover_image_id: record.optional("cover_image_id")?,
            category_id: record.required("category_id")?,
        })
    }
}

impl CacheEntity for Category {
    const ENTITY_TYPE: EntityType = EntityType::Category;

    fn id(&self) -> EntityId {
        self.id
    }

    fn encode(&self) -> CacheRecord {
        CacheRecord::new()
            .with("id", self.id)
            .with("name", &self.name)
            .with("description", &self.description)
            .with("display_mode", self.display_mode)
    }

    fn decode(record: &CacheRecord) -> Result<Self, DecodeError> {
        Ok(Category {
            id: record.required("id")?,
            name: record.required("name")?,
            description: record.required("description")?,
            display_mode: record.required("display_mode")?,
        })
    }
}

impl CacheEntity for Tag {
    const ENTITY_TYPE: EntityType = EntityType::Tag;

    fn id(&self) -> EntityId {
        self.id
    }

    fn encode(&self) -> CacheRecord {
        CacheRecord::new()
            .with("id", self.id)
            .with("name", &self.name)
            .with("description", &self.description)
    }

    fn decode(record: &CacheRecord) -> Result<Self, DecodeError> {
        Ok(Tag {
            id: record.required("id")?,
            name: record.required("name")?,
            description: record.required("description")?,
        })
    }
}

impl CacheEntity for Translation {
    const ENTITY_TYPE: EntityType = EntityType::Translation;

    fn id(&self) -> EntityId {
        self.id
    }

    fn encode(&self) -> CacheRecord {
        CacheRecord::new()
            .with("id", self.id)
            .with("translation_code", &self.translation_code)
            .with("full_name", &self.full_name)
    }

    fn decode(record: &CacheRecord) -> Result<Self, DecodeError> {
        Ok(Translation {
            id: record.required("id")?,
            translation_code: record.required("translation_code")?,
            full_name: record.required("full_name")?,
        })
    }
}

impl CacheEntity for TopicTranslation {
    const ENTITY_TYPE: EntityType = EntityType::TopicTranslation;

    fn id(&self) -> EntityId {
        self.id
    }

    fn encode(&self) -> CacheRecord {
        CacheRecord::new()
            .with("id", self.id)
            .with("translation_code", &self.translation_code)
            .with("topic_id", self.topic_id)
            .with("parse_mode", self.parse_mode)
            .with("text", &self.text)
            .with("full_name", &self.full_name)
    }

    fn decode(record: &CacheRecord) -> Result<Self, DecodeError> {
        Ok(TopicTranslation {
            id: record.required("id")?,
            translation_code: record.required("translation_code")?,
            topic_id: record.required("topic_id")?,
            parse_mode: record.required("parse_mode")?,
            text: record.required("text")?,
            full_name: record.required("full_name")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizons_core::{DisplayMode, ParseMode};
    use time::macros::datetime;
    use uuid::Uuid;

    fn topic() -> Topic {
        Topic {
            id: 42,
            name: "X".into(),
            created_at: datetime!(2024-05-01 12:00:00.123456789 UTC),
            edited_at: datetime!(2024-05-02 08:30 UTC),
            creator_user_id: None,
            cover_image_id: None,
            category_id: 1,
        }
    }

    #[test]
    fn test_topic_echo_with_nulls() {
        let topic = topic();
        let record = topic.encode();
        assert_eq!(record.get("creator_user_id"), Some(None));
        assert_eq!(Topic::decode(&record).unwrap(), topic);
    }

    #[test]
    fn test_topic_echo_with_values() {
        let topic = Topic {
            creator_user_id: Some(Uuid::new_v4()),
            cover_image_id: Some(0),
            ..topic()
        };
        assert_eq!(Topic::decode(&topic.encode()).unwrap(), topic);
    }

    #[test]
    fn test_empty_and_literal_null_strings_survive() {
        let tag = Tag {
            id: 7,
            name: "null".into(),
            description: String::new(),
        };
        assert_eq!(Tag::decode(&tag.encode()).unwrap(), tag);
    }

    #[test]
    fn test_enums_are_stored_by_name() {
        let category = Category {
            id: 1,
            name: "lore".into(),
            description: "world building".into(),
            display_mode: DisplayMode::Wiki,
        };
        assert_eq!(category.encode().get("display_mode"), Some(Some("Wiki")));
        assert_eq!(Category::decode(&category.encode()).unwrap(), category);

        let translation = TopicTranslation {
            id: 3,
            translation_code: "en".into(),
            topic_id: 42,
            parse_mode: ParseMode::BbCode,
            text: "[b]hi[/b]".into(),
            full_name: "English".into(),
        };
        assert_eq!(
            TopicTranslation::decode(&translation.encode()).unwrap(),
            translation
        );
    }

    #[test]
    fn test_bad_enum_is_a_decode_error() {
        let record = CacheRecord::new()
            .with("id", 1)
            .with("name", "lore")
            .with("description", "")
            .with("display_mode", "Grid");
        assert!(matches!(
            Category::decode(&record).unwrap_err(),
            DecodeError::InvalidField {
                field: "display_mode",
                ..
            }
        ));
    }

    #[test]
    fn test_null_in_required_field_is_rejected() {
        let record = Translation {
            id: 2,
            translation_code: "ja".into(),
            full_name: "Japanese".into(),
        }
        .encode();
        let mut record = record;
        record.insert("full_name", None);
        assert_eq!(
            Translation::decode(&record).unwrap_err(),
            DecodeError::UnexpectedNull { field: "full_name" }
        );
    }
}
