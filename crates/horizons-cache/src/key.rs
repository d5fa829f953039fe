//! Cache key codec.
//!
//! ## Key Format
//!
//! `<type>:<id>[:<related type>][:<suffix>]`
//!
//! | Key | Holds |
//! |-----|-------|
//! | `topic:1` | record hash |
//! | `topic:1:count` | access counter |
//! | `topic:1:tag:count` | access counter of topic 1's tag collection |
//! | `topic:1:tag` | relation set: keys of topic 1's cached tags |
//! | `topic:1:back-relation` | keys of entities whose relation sets hold `topic:1` |
//! | `topic:1:cascade` | keys whose cached copies die with `topic:1` |
//!
//! Types and suffixes are closed enumerations with separator-free names that
//! never coincide, and ids are integers, so distinct keys never collide and
//! every encoded key parses back to the same value.

use horizons_core::{EntityId, EntityType};
use std::fmt;
use std::str::FromStr;

use crate::error::KeyError;

pub const SEPARATOR: char = ':';

/// Trailing marker distinguishing derived keys from relation sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySuffix {
    Count,
    Cascade,
    BackRelation,
}

impl KeySuffix {
    pub const fn as_str(&self) -> &'static str {
        match self {
            KeySuffix::Count => "count",
            KeySuffix::Cascade => "cascade",
            KeySuffix::BackRelation => "back-relation",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "count" => Some(KeySuffix::Count),
            "cascade" => Some(KeySuffix::Cascade),
            "back-relation" => Some(KeySuffix::BackRelation),
            _ => None,
        }
    }
}

impl fmt::Display for KeySuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one cached row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub entity_type: EntityType,
    pub id: EntityId,
}

impl EntityKey {
    pub const fn new(entity_type: EntityType, id: EntityId) -> Self {
        Self { entity_type, id }
    }

    fn derive(self, relation: Option<EntityType>, suffix: Option<KeySuffix>) -> CacheKey {
        CacheKey {
            entity: self,
            relation,
            suffix,
        }
    }

    /// `type:id`
    pub fn record_key(self) -> CacheKey {
        self.derive(None, None)
    }

    /// `type:id:count`, or `type:id:related:count` for a relation collection.
    pub fn count_key(self, related: Option<EntityType>) -> CacheKey {
        self.derive(related, Some(KeySuffix::Count))
    }

    /// `type:id:cascade`
    pub fn cascade_key(self) -> CacheKey {
        self.derive(None, Some(KeySuffix::Cascade))
    }

    /// `type:id:related`
    pub fn relation_key(self, related: EntityType) -> CacheKey {
        self.derive(Some(related), None)
    }

    /// `type:id:back-relation`
    pub fn back_relation_key(self) -> CacheKey {
        self.derive(None, Some(KeySuffix::BackRelation))
    }

    /// Parses a record key (`type:id`), as stored in relation and cascade sets.
    pub fn parse(s: &str) -> Result<Self, KeyError> {
        let key: CacheKey = s.parse()?;
        if !key.is_record() {
            return Err(KeyError::malformed(s, "expected a record key `<type>:<id>`"));
        }
        Ok(key.entity)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.entity_type, self.id)
    }
}

/// Any key in the cache namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub entity: EntityKey,
    pub relation: Option<EntityType>,
    pub suffix: Option<KeySuffix>,
}

impl CacheKey {
    pub fn is_record(&self) -> bool {
        self.relation.is_none() && self.suffix.is_none()
    }

    /// Encoded form used as the store key.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entity)?;
        if let Some(relation) = self.relation {
            write!(f, "{SEPARATOR}{relation}")?;
        }
        if let Some(suffix) = self.suffix {
            write!(f, "{SEPARATOR}{suffix}")?;
        }
        Ok(())
    }
}

impl FromStr for CacheKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(SEPARATOR).collect();
        if !(2..=4).contains(&parts.len()) {
            return Err(KeyError::malformed(
                s,
                format!("expected 2 to 4 components, found {}", parts.len()),
            ));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(KeyError::malformed(s, "empty component"));
        }

        let entity_type: EntityType = parts[0]
            .parse()
            .map_err(|e| KeyError::malformed(s, format!("{e}")))?;
        let id: EntityId = parts[1]
            .parse()
            .map_err(|_| KeyError::malformed(s, format!("invalid id `{}`", parts[1])))?;
        let entity = EntityKey::new(entity_type, id);

        let (relation, suffix) = match &parts[2..] {
            [] => (None, None),
            [last] => match KeySuffix::parse(last) {
                Some(suffix) => (None, Some(suffix)),
                None => {
                    let related: EntityType = last
                        .parse()
                        .map_err(|_| KeyError::malformed(s, format!("unknown component `{last}`")))?;
                    (Some(related), None)
                }
            },
            [related, last] => {
                let related: EntityType = related
                    .parse()
                    .map_err(|_| KeyError::malformed(s, format!("unknown related type `{related}`")))?;
                if KeySuffix::parse(last) != Some(KeySuffix::Count) {
                    return Err(KeyError::malformed(
                        s,
                        format!("only `count` may follow a related type, found `{last}`"),
                    ));
                }
                (Some(related), Some(KeySuffix::Count))
            }
            _ => unreachable!("arity checked above"),
        };

        Ok(CacheKey {
            entity,
            relation,
            suffix,
        })
    }
}
