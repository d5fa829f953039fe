//! Derived relation state between cached entities.
//!
//! Three kinds of sets hang off every entity key:
//!
//! - `type:id:<related>`: forward relation set, record keys of related entities
//! - `type:id:back-relation`: record keys of owners whose relation sets hold this key
//! - `type:id:cascade`: record keys whose cached copies die with this entity
//!
//! None of this is authoritative. Edges may dangle after an interrupted
//! operation, and readers skip members whose record is gone; every edge can
//! be rebuilt from the source of truth.

use horizons_core::EntityType;
use std::collections::HashSet;

use crate::error::CacheError;
use crate::key::{CacheKey, EntityKey};
use crate::record::{CacheEntity, RecordStore};
use crate::store::DynStore;

/// Records resolved from one relation set, with the set's size at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSnapshot<E> {
    pub members: usize,
    pub records: Vec<E>,
}

impl<E> RelationSnapshot<E> {
    /// `true` when every member still had a cached record.
    pub fn is_complete(&self) -> bool {
        self.records.len() == self.members
    }

    pub fn is_empty(&self) -> bool {
        self.members == 0
    }
}

#[derive(Clone)]
pub struct RelationGraph {
    store: DynStore,
    records: RecordStore,
}

impl RelationGraph {
    pub fn new(store: DynStore) -> Self {
        Self {
            records: RecordStore::new(store.clone()),
            store,
        }
    }

    /// Adds `member` to `owner`'s relation set and `owner` to `member`'s
    /// back-relation set. Idempotent.
    pub async fn add_relation(&self, owner: EntityKey, member: EntityKey) -> Result<(), CacheError> {
        self.link_forward(owner, member).await?;
        self.link_back(member, owner).await?;
        tracing::debug!(owner = %owner, member = %member, "relation added");
        Ok(())
    }

    /// Forward edge only.
    pub async fn link_forward(&self, owner: EntityKey, member: EntityKey) -> Result<bool, CacheError> {
        let set = owner.relation_key(member.entity_type);
        self.store.set_add(&set.encode(), &member.to_string()).await
    }

    /// Inverse edge only: records that `owner` points at `member`.
    pub async fn link_back(&self, member: EntityKey, owner: EntityKey) -> Result<bool, CacheError> {
        self.store
            .set_add(&member.back_relation_key().encode(), &owner.to_string())
            .await
    }

    /// Removes the forward edge `owner → member`.
    pub async fn delete_relation(&self, owner: EntityKey, member: EntityKey) -> Result<bool, CacheError> {
        let set = owner.relation_key(member.entity_type);
        self.store.set_remove(&set.encode(), &member.to_string()).await
    }

    /// Removes the inverse edge recorded on `member` for `owner`.
    pub async fn delete_back_relation(
        &self,
        member: EntityKey,
        owner: EntityKey,
    ) -> Result<bool, CacheError> {
        self.store
            .set_remove(&member.back_relation_key().encode(), &owner.to_string())
            .await
    }

    /// Drops `owner`'s whole relation set for `related`. Members keep their
    /// back-relation entries, which become dangling.
    pub async fn clear_relations(&self, owner: EntityKey, related: EntityType) -> Result<(), CacheError> {
        self.store
            .delete(&[owner.relation_key(related).encode()])
            .await?;
        Ok(())
    }

    pub async fn add_cascade(&self, owner: EntityKey, member: EntityKey) -> Result<bool, CacheError> {
        self.store
            .set_add(&owner.cascade_key().encode(), &member.to_string())
            .await
    }

    /// Keys in `owner`'s relation set for `related`.
    pub async fn members(&self, owner: EntityKey, related: EntityType) -> Result<Vec<EntityKey>, CacheError> {
        self.read_set(owner.relation_key(related)).await
    }

    /// Owners recorded in `member`'s back-relation set.
    pub async fn back_relations(&self, member: EntityKey) -> Result<Vec<EntityKey>, CacheError> {
        self.read_set(member.back_relation_key()).await
    }

    pub async fn cascade_members(&self, owner: EntityKey) -> Result<Vec<EntityKey>, CacheError> {
        self.read_set(owner.cascade_key()).await
    }

    /// Resolves `owner`'s relation set for `E` into records in one batch.
    /// Members without a cached record are left out.
    pub async fn load_relations<E: CacheEntity>(
        &self,
        owner: EntityKey,
    ) -> Result<RelationSnapshot<E>, CacheError> {
        let members = self.members(owner, E::ENTITY_TYPE).await?;
        let records = self.records.get_many::<E>(&members).await?;
        if records.len() < members.len() {
            tracing::debug!(
                owner = %owner,
                members = members.len(),
                cached = records.len(),
                "relation set has dangling members"
            );
        }
        Ok(RelationSnapshot {
            members: members.len(),
            records,
        })
    }

    /// Deletes `root` and, transitively, everything in its cascade closure.
    ///
    /// Members are purged before their owners, so if this is interrupted the
    /// root still exists with its cascade set and calling `purge` again
    /// finishes the job. Cycles in cascade sets are visited once. Returns the
    /// number of entities purged (including ones that were never cached).
    pub async fn purge(&self, root: EntityKey) -> Result<usize, CacheError> {
        let mut order = vec![root];
        let mut seen = HashSet::from([root]);
        let mut next = 0;
        while next < order.len() {
            let owner = order[next];
            next += 1;
            for member in self.cascade_members(owner).await? {
                if seen.insert(member) {
                    order.push(member);
                }
            }
        }

        for key in order.iter().rev() {
            self.purge_one(*key).await?;
        }
        tracing::debug!(root = %root, purged = order.len(), "cascade purge finished");
        Ok(order.len())
    }

    async fn purge_one(&self, key: EntityKey) -> Result<(), CacheError> {
        let mut doomed = vec![
            key.record_key().encode(),
            key.cascade_key().encode(),
            key.count_key(None).encode(),
        ];
        for related in EntityType::ALL {
            doomed.push(key.relation_key(related).encode());
            doomed.push(key.count_key(Some(related)).encode());
        }
        self.store.delete(&doomed).await?;

        // Unhook inbound edges: each owner that lists this key keeps it in
        // its relation set for this entity's type.
        let member = key.to_string();
        for owner in self.back_relations(key).await? {
            let set = owner.relation_key(key.entity_type);
            self.store.set_remove(&set.encode(), &member).await?;
        }
        self.store.delete(&[key.back_relation_key().encode()]).await?;
        Ok(())
    }

    async fn read_set(&self, key: CacheKey) -> Result<Vec<EntityKey>, CacheError> {
        let raw = self.store.set_members(&key.encode()).await?;
        let mut keys = Vec::with_capacity(raw.len());
        for member in raw {
            keys.push(EntityKey::parse(&member)?);
        }
        Ok(keys)
    }
}
