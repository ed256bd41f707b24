//! In-memory catalog

use super::Catalog;
use crate::model::{BlobId, FileRecord};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// A catalog holding records in insertion order
pub struct MemoryCatalog {
    records: RwLock<Vec<FileRecord>>,
    unique_filename: bool,
}

impl MemoryCatalog {
    /// Create an empty catalog with a unique index on filename
    pub fn new() -> Self {
        MemoryCatalog {
            records: RwLock::new(Vec::new()),
            unique_filename: true,
        }
    }

    /// Create an empty catalog that accepts duplicate filenames
    ///
    /// Mirrors a collection without a unique index, where two writers racing
    /// on the same name can both succeed.
    pub fn without_unique_index() -> Self {
        MemoryCatalog {
            records: RwLock::new(Vec::new()),
            unique_filename: false,
        }
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog for MemoryCatalog {
    fn find_by_filename(&self, filename: &str) -> Result<Vec<FileRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.filename == filename)
            .cloned()
            .collect())
    }

    fn find_uploaded_between(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FileRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.uploaded_between(begin, end))
            .cloned()
            .collect())
    }

    fn insert(&self, record: FileRecord) -> Result<()> {
        let mut records = self.records.write();
        if self.unique_filename && records.iter().any(|r| r.filename == record.filename) {
            return Err(Error::DuplicateKey {
                field: "filename",
                value: record.filename,
            });
        }
        records.push(record);
        Ok(())
    }

    fn delete(&self, id: &BlobId) -> Result<bool> {
        let mut records = self.records.write();
        match records.iter().position(|r| &r.id == id) {
            Some(pos) => {
                records.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn count(&self) -> Result<usize> {
        Ok(self.records.read().len())
    }
}
