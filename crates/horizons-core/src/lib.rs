//! Domain types shared by the Horizons entity cache and the catalog.
//!
//! The authoritative relational store owns these rows; the cache only ever
//! holds snapshots of them keyed by [`EntityType`] and id.

pub mod entity;
pub mod error;
pub mod model;

pub use entity::{EntityId, EntityType};
pub use error::CoreError;
pub use model::{
    Category, CategoryPatch, DisplayMode, NewTopic, NewTopicTranslation, ParseMode, Tag,
    TagPatch, Topic, TopicTranslation, Translation,
};
