//! Relation-aware, lazily promoted entity cache.
//!
//! ## Architecture
//!
//! ```text
//! EntityCache<E> ──► AccessCounter   type:id[:related]:count
//!                ├─► RecordStore     type:id                 (hash)
//!                └─► RelationGraph   type:id:related         (set)
//!                                    type:id:back-relation   (set)
//!                                    type:id:cascade         (set)
//!                          │
//!                          ▼
//!                   KeyValueStore (Redis or in-process)
//! ```
//!
//! Entities are only cached after callers observe enough accesses, so cold
//! rows never occupy memory. Relation sets let "a topic's tags" be served
//! without a join, and cascade sets propagate deletions to owned entities.
//!
//! Nothing is transactional across keys. Every multi-step operation
//! tolerates partial application: readers skip dangling relation members,
//! and repeating a delete on the root finishes an interrupted one.

pub mod config;
pub mod counter;
pub mod entities;
pub mod entity_cache;
pub mod error;
pub mod graph;
pub mod key;
pub mod record;
pub mod store;

pub use config::{CacheConfig, RedisConfig};
pub use counter::AccessCounter;
pub use entity_cache::{EntityCache, EntityCaches};
pub use error::{CacheError, DecodeError, ErrorCategory, KeyError};
pub use graph::{RelationGraph, RelationSnapshot};
pub use key::{CacheKey, EntityKey, KeySuffix};
pub use record::{CacheEntity, CacheRecord, RecordStore, NULL_SENTINEL};
pub use store::{DynStore, KeyValueStore, MemoryStore, RawHash, RedisStore, connect_store};
