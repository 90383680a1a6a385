//! Concurrent store of memory instances keyed by identity.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{MemoryError, Result};
use crate::memory::{Memory, MemoryId};

/// Mapping from [`MemoryId`] to an exclusively-owned [`Memory`].
///
/// Populated once at startup (insert-once, duplicates rejected) and read
/// concurrently by every connection for the rest of the process lifetime.
#[derive(Debug, Default)]
pub struct Store {
    memories: DashMap<MemoryId, Arc<Memory>>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            memories: DashMap::new(),
        }
    }

    /// Register a memory under `id`. Fails on invalid identity or when a
    /// memory already exists for `id`; never replaces.
    pub fn add(&self, id: MemoryId, memory: Arc<Memory>) -> Result<()> {
        id.validate()?;

        match self.memories.entry(id) {
            Entry::Occupied(_) => Err(MemoryError::DuplicateMemoryId),
            Entry::Vacant(slot) => {
                slot.insert(memory);
                Ok(())
            }
        }
    }

    /// Concurrent lookup; `None` when no memory is registered for `id`.
    pub fn get(&self, id: MemoryId) -> Option<Arc<Memory>> {
        self.memories.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Lookup that fails explicitly with [`MemoryError::UnknownMemoryId`];
    /// used by request-handling hot paths that want a single-branch failure.
    pub fn must_get(&self, id: MemoryId) -> Result<Arc<Memory>> {
        self.get(id).ok_or(MemoryError::UnknownMemoryId)
    }

    /// Number of registered memories.
    pub fn len(&self) -> usize {
        self.memories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }
}
