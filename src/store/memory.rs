//! In-memory blob store

use super::{Blob, BlobStore};
use crate::model::BlobId;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;

/// A blob store that keeps every object in a map
///
/// Useful for tests and short-lived tools; nothing survives the process.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<BlobId, Blob>>,
}

impl MemoryBlobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, name: &str, data: &[u8]) -> Result<BlobId> {
        let id = BlobId::generate(name);
        self.objects
            .write()
            .insert(id, Blob::new(name, data.to_vec()));
        Ok(id)
    }

    fn get(&self, id: &BlobId) -> Result<Vec<u8>> {
        self.objects
            .read()
            .get(id)
            .map(|blob| blob.data.clone())
            .ok_or_else(|| Error::NotFound(id.to_hex()))
    }

    fn delete(&self, id: &BlobId) -> Result<()> {
        self.objects
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(id.to_hex()))
    }

    fn contains(&self, id: &BlobId) -> bool {
        self.objects.read().contains_key(id)
    }

    fn object_count(&self) -> usize {
        self.objects.read().len()
    }
}
