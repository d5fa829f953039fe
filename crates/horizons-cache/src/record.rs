//! Flat field snapshots of entities and their storage as hashes.
//!
//! A [`CacheRecord`] maps field names to optional strings. On the wire every
//! value is a plain string; null is written as [`NULL_SENTINEL`], a lone NUL
//! byte. Real values that start with NUL get one extra NUL prepended, so the
//! encoding stays reversible and null never collides with `""`, `"0"` or the
//! text `"null"`.

use horizons_core::{EntityId, EntityType};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{CacheError, DecodeError};
use crate::key::EntityKey;
use crate::store::{DynStore, RawHash};

pub const NULL_SENTINEL: &str = "\u{0}";
const ESCAPE: char = '\u{0}';

/// Wire form of one field value.
pub fn encode_field(value: Option<&str>) -> String {
    match value {
        None => NULL_SENTINEL.to_string(),
        Some(v) if v.starts_with(ESCAPE) => format!("{ESCAPE}{v}"),
        Some(v) => v.to_string(),
    }
}

/// Inverse of [`encode_field`].
pub fn decode_field(raw: &str) -> Option<String> {
    if raw == NULL_SENTINEL {
        return None;
    }
    Some(raw.strip_prefix(ESCAPE).unwrap_or(raw).to_string())
}

/// Field name to value snapshot of one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheRecord {
    fields: BTreeMap<String, Option<String>>,
}

impl CacheRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a non-null field.
    pub fn with(mut self, field: &str, value: impl ToString) -> Self {
        self.insert(field, Some(value.to_string()));
        self
    }

    /// Builder-style insert of a nullable field.
    pub fn with_optional<T: ToString>(mut self, field: &str, value: Option<T>) -> Self {
        self.insert(field, value.map(|v| v.to_string()));
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Option<String>) {
        self.fields.insert(field.into(), value);
    }

    /// `None` if the field is absent, `Some(None)` if it is null.
    pub fn get(&self, field: &str) -> Option<Option<&str>> {
        self.fields.get(field).map(|v| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Reads a non-nullable field through [`FromStr`].
    pub fn required<T>(&self, field: &'static str) -> Result<T, DecodeError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.required_with(field, str::parse::<T>)
    }

    /// Reads a nullable field through [`FromStr`].
    pub fn optional<T>(&self, field: &'static str) -> Result<Option<T>, DecodeError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(field) {
            None => Err(DecodeError::MissingField { field }),
            Some(None) => Ok(None),
            Some(Some(raw)) => raw
                .parse()
                .map(Some)
                .map_err(|e| DecodeError::invalid(field, raw, e)),
        }
    }

    /// Reads a non-nullable field with a custom parser.
    pub fn required_with<T, E, F>(&self, field: &'static str, parse: F) -> Result<T, DecodeError>
    where
        F: FnOnce(&str) -> Result<T, E>,
        E: fmt::Display,
    {
        match self.get(field) {
            None => Err(DecodeError::MissingField { field }),
            Some(None) => Err(DecodeError::UnexpectedNull { field }),
            Some(Some(raw)) => parse(raw).map_err(|e| DecodeError::invalid(field, raw, e)),
        }
    }

    pub(crate) fn to_wire(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), encode_field(v.as_deref())))
            .collect()
    }

    pub(crate) fn from_wire(raw: RawHash) -> Self {
        let fields = raw
            .into_iter()
            .map(|(k, v)| {
                let value = decode_field(&v);
                (k, value)
            })
            .collect();
        Self { fields }
    }
}

/// A typed row that can be cached as a [`CacheRecord`].
///
/// `decode` must reject anything `encode` could not have produced rather
/// than fall back to defaults: a record that fails to decode is corruption,
/// not a cache miss.
pub trait CacheEntity: Sized + Send + Sync + 'static {
    const ENTITY_TYPE: EntityType;

    fn id(&self) -> EntityId;

    fn encode(&self) -> CacheRecord;

    fn decode(record: &CacheRecord) -> Result<Self, DecodeError>;

    fn cache_key(&self) -> EntityKey {
        EntityKey::new(Self::ENTITY_TYPE, self.id())
    }
}

/// Reads and writes record hashes.
#[derive(Clone)]
pub struct RecordStore {
    store: DynStore,
}

impl RecordStore {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    /// Replaces the record at `key` with the full snapshot of `entity`.
    pub async fn set<E: CacheEntity>(&self, key: EntityKey, entity: &E) -> Result<(), CacheError> {
        let fields = entity.encode().to_wire();
        self.store
            .replace_hash(&key.record_key().encode(), fields)
            .await
    }

    /// Returns the raw record, without interpreting it as an entity.
    pub async fn get_raw(&self, key: EntityKey) -> Result<Option<CacheRecord>, CacheError> {
        let raw = self.store.get_hash(&key.record_key().encode()).await?;
        Ok(raw.map(CacheRecord::from_wire))
    }

    pub async fn get<E: CacheEntity>(&self, key: EntityKey) -> Result<Option<E>, CacheError> {
        match self.get_raw(key).await? {
            None => Ok(None),
            Some(record) => decode_record(key, &record).map(Some),
        }
    }

    /// Fetches many records in one round trip, skipping absent ones.
    pub async fn get_many<E: CacheEntity>(&self, keys: &[EntityKey]) -> Result<Vec<E>, CacheError> {
        let encoded: Vec<String> = keys.iter().map(|k| k.record_key().encode()).collect();
        let rows = self.store.get_hashes(&encoded).await?;

        let mut entities = Vec::with_capacity(rows.len());
        for (key, row) in keys.iter().zip(rows) {
            match row {
                Some(raw) => entities.push(decode_record(*key, &CacheRecord::from_wire(raw))?),
                None => tracing::debug!(key = %key, "relation member no longer cached"),
            }
        }
        Ok(entities)
    }

    pub async fn exists(&self, key: EntityKey) -> Result<bool, CacheError> {
        self.store.exists(&key.record_key().encode()).await
    }

    pub async fn delete(&self, key: EntityKey) -> Result<(), CacheError> {
        self.store.delete(&[key.record_key().encode()]).await?;
        Ok(())
    }
}

fn decode_record<E: CacheEntity>(key: EntityKey, record: &CacheRecord) -> Result<E, CacheError> {
    E::decode(record).map_err(|source| {
        tracing::warn!(key = %key, error = %source, "cached record failed to decode");
        CacheError::decode(key.to_string(), source)
    })
}
