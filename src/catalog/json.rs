//! JSON document catalog
//!
//! One collection is one JSON file holding an array of records. The file is
//! read on every query and replaced atomically (temp file + rename) on every
//! write.

use super::Catalog;
use crate::model::{BlobId, FileRecord};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// A file-backed collection of [`FileRecord`]s with a unique filename index
pub struct JsonCatalog {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl JsonCatalog {
    /// Open the collection at `path`, creating parent directories
    ///
    /// The file itself is created on first insert.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Ok(JsonCatalog {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Get the collection file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<FileRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    fn store(&self, records: &[FileRecord]) -> Result<()> {
        let content = serde_json::to_string_pretty(records)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Catalog for JsonCatalog {
    fn find_by_filename(&self, filename: &str) -> Result<Vec<FileRecord>> {
        let records = self.load()?;
        Ok(records
            .into_iter()
            .filter(|r| r.filename == filename)
            .collect())
    }

    fn find_uploaded_between(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FileRecord>> {
        let records = self.load()?;
        Ok(records
            .into_iter()
            .filter(|r| r.uploaded_between(begin, end))
            .collect())
    }

    fn insert(&self, record: FileRecord) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut records = self.load()?;

        if records.iter().any(|r| r.filename == record.filename) {
            return Err(Error::DuplicateKey {
                field: "filename",
                value: record.filename,
            });
        }

        records.push(record);
        self.store(&records)
    }

    fn delete(&self, id: &BlobId) -> Result<bool> {
        let _guard = self.write_lock.lock();
        let mut records = self.load()?;

        let before = records.len();
        records.retain(|r| &r.id != id);
        if records.len() == before {
            return Ok(false);
        }

        self.store(&records)?;
        Ok(true)
    }

    fn count(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }
}
