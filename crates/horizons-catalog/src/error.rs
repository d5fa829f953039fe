use horizons_core::{EntityId, EntityType};

use crate::source::SourceError;

/// Errors returned by catalog operations.
///
/// Cache failures never appear here: the catalog logs them and falls back
/// to the source.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("{entity_type} {id} not found")]
    NotFound { entity_type: EntityType, id: EntityId },
}

impl CatalogError {
    #[must_use]
    pub fn not_found(entity_type: EntityType, id: EntityId) -> Self {
        Self::NotFound { entity_type, id }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
