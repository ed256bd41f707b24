//! Catalog trait definition

use crate::model::{BlobId, FileRecord};
use crate::Result;
use chrono::{DateTime, Utc};

/// A document collection of [`FileRecord`]s
///
/// Implementations are expected to keep a unique index on `filename` and
/// reject a conflicting insert with [`Error::DuplicateKey`].
///
/// [`Error::DuplicateKey`]: crate::Error::DuplicateKey
pub trait Catalog: Send + Sync {
    /// All records with the given filename
    fn find_by_filename(&self, filename: &str) -> Result<Vec<FileRecord>>;

    /// All records with `begin <= upload_time < end`
    fn find_uploaded_between(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FileRecord>>;

    /// Insert one record
    fn insert(&self, record: FileRecord) -> Result<()>;

    /// Delete the record with the given id, returning whether one was removed
    fn delete(&self, id: &BlobId) -> Result<bool>;

    /// Number of records
    fn count(&self) -> Result<usize>;

    /// Whether any record has the given filename
    fn exists(&self, filename: &str) -> Result<bool> {
        Ok(!self.find_by_filename(filename)?.is_empty())
    }
}
