use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace};

use crate::core::error::MappingError;
use crate::mapping::metadata::{Entity, EntityMetadata};

/// Resolves and caches entity metadata per type.
///
/// Two threads resolving the same type at once may both build the metadata;
/// the results are identical, so whichever insert lands last is kept.
#[derive(Debug)]
pub struct MappingContext {
    cache: RwLock<HashMap<TypeId, Arc<EntityMetadata>>>,
    cache_enabled: bool,
}

impl MappingContext {
    pub fn new() -> Self {
        Self::with_cache(true)
    }

    pub fn with_cache(cache_enabled: bool) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            cache_enabled,
        }
    }

    /// Metadata of a top-level entity; requires a table and exactly one primary key.
    pub fn resolve<E: Entity>(&self) -> Result<Arc<EntityMetadata>, MappingError> {
        let metadata = self.metadata_for::<E>();
        metadata.validate()?;
        Ok(metadata)
    }

    /// Metadata of a type read as a nested element; table and key are optional.
    pub fn resolve_embedded<E: Entity>(&self) -> Result<Arc<EntityMetadata>, MappingError> {
        let metadata = self.metadata_for::<E>();
        metadata.validate_embedded()?;
        Ok(metadata)
    }

    pub fn cached_types(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn clear(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn metadata_for<E: Entity>(&self) -> Arc<EntityMetadata> {
        if !self.cache_enabled {
            return Arc::new(E::entity_metadata());
        }

        let type_id = TypeId::of::<E>();
        // The map is only ever touched by whole inserts, so a poisoned lock
        // still guards consistent data.
        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
        {
            trace!(entity = hit.type_name(), "metadata cache hit");
            return Arc::clone(hit);
        }

        let metadata = Arc::new(E::entity_metadata());
        debug!(
            entity = metadata.type_name(),
            table = metadata.table_name().unwrap_or("-"),
            fields = metadata.fields().len(),
            "resolved entity metadata"
        );
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(type_id, Arc::clone(&metadata));
        metadata
    }
}

impl Default for MappingContext {
    fn default() -> Self {
        Self::new()
    }
}
