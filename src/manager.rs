//! High-level file API
//!
//! [`FileManager`] ties a [`Catalog`] to a [`BlobStore`]. The catalog is
//! consulted before every write, bytes go to the blob store, and the two are
//! kept in step on upload and delete. Neither step pair is transactional: a
//! crash between the blob write and the catalog insert leaves an orphaned
//! blob, and a crash between the catalog delete and the blob delete leaves
//! an unreferenced blob.

use crate::catalog::{Catalog, JsonCatalog, MemoryCatalog};
use crate::config::Config;
use crate::model::FileRecord;
use crate::store::{BlobStore, FileBlobStore, MemoryBlobStore};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Coordinates the metadata catalog and the blob store
///
/// Provides:
/// - Existence checks and upload-time range listing
/// - Upload of local files under a unique logical name
/// - Download and delete by name
pub struct FileManager {
    catalog: Arc<dyn Catalog>,
    blobs: Arc<dyn BlobStore>,
}

impl FileManager {
    /// Create a manager over the given collaborators
    pub fn new(catalog: impl Catalog + 'static, blobs: impl BlobStore + 'static) -> Self {
        FileManager {
            catalog: Arc::new(catalog),
            blobs: Arc::new(blobs),
        }
    }

    /// A manager with nothing persisted
    pub fn in_memory() -> Self {
        Self::new(MemoryCatalog::new(), MemoryBlobStore::new())
    }

    /// Open the file-backed catalog and bucket described by `config`
    pub fn open(config: &Config) -> Result<Self> {
        let catalog = JsonCatalog::open(config.catalog_path())?;
        let blobs = FileBlobStore::open_or_create(config.bucket_path())?;
        debug!(root = %config.root.display(), bucket = %config.bucket, "opened file manager");
        Ok(Self::new(catalog, blobs))
    }

    /// The underlying catalog
    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    /// The underlying blob store
    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    /// Check whether a file is stored under `filename`
    pub fn exists(&self, filename: &str) -> Result<bool> {
        self.catalog.exists(filename)
    }

    /// Files uploaded in `[begin, end)`, where `end` defaults to now
    pub fn list_files(
        &self,
        begin: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<FileRecord>> {
        let end = end.unwrap_or_else(Utc::now);
        let records = self.catalog.find_uploaded_between(begin, end)?;
        debug!(%begin, %end, count = records.len(), "listed files");
        Ok(records)
    }

    /// Number of stored files
    pub fn count(&self) -> Result<usize> {
        self.catalog.count()
    }

    /// Store a local file under `save_name`, or its basename when `None` or empty
    ///
    /// Surrounding double quotes are stripped from `path`. The file is read in
    /// full before anything is written, so an unreadable path leaves both
    /// stores untouched.
    pub fn upload_file(
        &self,
        path: impl AsRef<Path>,
        save_name: Option<&str>,
    ) -> Result<FileRecord> {
        let path = unquote(path.as_ref());
        let bytes = std::fs::read(&path).map_err(|source| Error::IoRead {
            path: path.clone(),
            source,
        })?;

        let name = match save_name.filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| Error::InvalidName(path.display().to_string()))?,
        };

        if self.catalog.exists(&name)? {
            return Err(Error::AlreadyExists(name));
        }

        let id = self.blobs.put(&name, &bytes)?;
        let record = FileRecord::new(id, name, bytes.len() as u64);

        match self.catalog.insert(record.clone()) {
            Ok(()) => {}
            Err(Error::DuplicateKey { value, .. }) => {
                // Lost a race with another writer; our blob is unreferenced
                warn!(filename = %value, %id, "filename taken during upload, removing blob");
                if let Err(e) = self.blobs.delete(&id) {
                    warn!(%id, error = %e, "failed to remove orphaned blob");
                }
                return Err(Error::AlreadyExists(value));
            }
            Err(e) => {
                warn!(%id, error = %e, "catalog insert failed, blob left orphaned");
                return Err(e);
            }
        }

        info!(
            filename = %record.filename,
            id = %record.id,
            size = record.file_size,
            "uploaded file"
        );
        Ok(record)
    }

    /// Fetch the bytes stored under `filename`
    ///
    /// An unknown filename yields an empty vector rather than an error, so an
    /// empty file and a missing one look the same. Use [`exists`] to tell
    /// them apart.
    ///
    /// [`exists`]: FileManager::exists
    pub fn download_file(&self, filename: &str) -> Result<Vec<u8>> {
        let records = self.catalog.find_by_filename(filename)?;

        match records.first() {
            Some(record) => {
                debug!(filename, id = %record.id, "downloading file");
                self.blobs.get(&record.id)
            }
            None => {
                debug!(filename, "no such file, returning empty payload");
                Ok(Vec::new())
            }
        }
    }

    /// Remove the file stored under `filename`
    ///
    /// Returns `false` without touching either store when nothing matches.
    /// More than one matching record is reported as
    /// [`Error::DuplicateRecord`] and nothing is deleted.
    pub fn delete_file(&self, filename: &str) -> Result<bool> {
        let records = self.catalog.find_by_filename(filename)?;

        let record = match records.as_slice() {
            [] => return Ok(false),
            [record] => record,
            _ => return Err(Error::DuplicateRecord(filename.to_string())),
        };

        self.catalog.delete(&record.id)?;
        self.blobs.delete(&record.id)?;

        info!(filename, id = %record.id, "deleted file");
        Ok(true)
    }
}

fn unquote(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(s.trim_matches('"')),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlobId;
    use chrono::Duration;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Hides existing records from the pre-insert check, as a concurrent
    /// writer would
    struct RacingCatalog(MemoryCatalog);

    impl Catalog for RacingCatalog {
        fn find_by_filename(&self, _filename: &str) -> Result<Vec<FileRecord>> {
            Ok(Vec::new())
        }

        fn find_uploaded_between(
            &self,
            begin: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<FileRecord>> {
            self.0.find_uploaded_between(begin, end)
        }

        fn insert(&self, record: FileRecord) -> Result<()> {
            self.0.insert(record)
        }

        fn delete(&self, id: &BlobId) -> Result<bool> {
            self.0.delete(id)
        }

        fn count(&self) -> Result<usize> {
            self.0.count()
        }
    }

    #[test]
    fn test_upload_uses_basename_by_default() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "report.txt", b"quarterly numbers");
        let fm = FileManager::in_memory();

        let record = fm.upload_file(&path, None).unwrap();

        assert_eq!(record.filename, "report.txt");
        assert_eq!(record.file_size, 17);
        assert!(fm.exists("report.txt").unwrap());
        assert_eq!(fm.download_file("report.txt").unwrap(), b"quarterly numbers");
    }

    #[test]
    fn test_upload_empty_save_name_falls_back_to_basename() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "a.bin", b"x");
        let fm = FileManager::in_memory();

        let record = fm.upload_file(&path, Some("")).unwrap();
        assert_eq!(record.filename, "a.bin");
    }

    #[test]
    fn test_upload_strips_surrounding_quotes() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "quoted.txt", b"hi");
        let quoted = format!("\"{}\"", path.display());
        let fm = FileManager::in_memory();

        let record = fm.upload_file(&quoted, None).unwrap();
        assert_eq!(record.filename, "quoted.txt");
    }

    #[test]
    fn test_upload_duplicate_name_leaves_original_untouched() {
        let dir = tempdir().unwrap();
        let first = write_file(dir.path(), "first.txt", b"original");
        let second = write_file(dir.path(), "second.txt", b"replacement");
        let fm = FileManager::in_memory();

        let original = fm.upload_file(&first, Some("shared")).unwrap();
        let err = fm.upload_file(&second, Some("shared")).unwrap_err();

        assert!(matches!(err, Error::AlreadyExists(ref name) if name == "shared"));
        assert_eq!(fm.download_file("shared").unwrap(), b"original");
        assert_eq!(fm.catalog().find_by_filename("shared").unwrap(), vec![original]);
        assert_eq!(fm.blobs().object_count(), 1);
    }

    #[test]
    fn test_upload_unreadable_path_mutates_nothing() {
        let dir = tempdir().unwrap();
        let fm = FileManager::in_memory();

        let err = fm
            .upload_file(dir.path().join("missing.txt"), None)
            .unwrap_err();

        assert!(matches!(err, Error::IoRead { .. }));
        assert_eq!(fm.count().unwrap(), 0);
        assert_eq!(fm.blobs().object_count(), 0);
    }

    #[test]
    fn test_upload_race_reports_already_exists_and_drops_blob() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "race.txt", b"payload");
        let fm = FileManager::new(RacingCatalog(MemoryCatalog::new()), MemoryBlobStore::new());

        fm.upload_file(&path, None).unwrap();
        let err = fm.upload_file(&path, None).unwrap_err();

        assert!(matches!(err, Error::AlreadyExists(_)));
        assert_eq!(fm.count().unwrap(), 1);
        assert_eq!(fm.blobs().object_count(), 1);
    }

    #[test]
    fn test_download_unknown_is_empty() {
        let fm = FileManager::in_memory();
        assert!(fm.download_file("never-uploaded").unwrap().is_empty());
    }

    #[test]
    fn test_download_with_missing_blob_surfaces_error() {
        let fm = FileManager::in_memory();
        let record = FileRecord::new(BlobId::generate("ghost"), "ghost", 5);
        fm.catalog().insert(record).unwrap();

        assert!(matches!(
            fm.download_file("ghost"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_removes_record_and_blob() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "doomed.txt", b"bye");
        let fm = FileManager::in_memory();
        let record = fm.upload_file(&path, None).unwrap();

        assert!(fm.delete_file("doomed.txt").unwrap());

        assert!(!fm.exists("doomed.txt").unwrap());
        assert!(!fm.blobs().contains(&record.id));
        assert!(fm.download_file("doomed.txt").unwrap().is_empty());
    }

    #[test]
    fn test_delete_unknown_returns_false() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "keep.txt", b"keep");
        let fm = FileManager::in_memory();
        fm.upload_file(&path, None).unwrap();

        assert!(!fm.delete_file("other.txt").unwrap());
        assert_eq!(fm.count().unwrap(), 1);
        assert_eq!(fm.blobs().object_count(), 1);
    }

    #[test]
    fn test_delete_duplicate_records_is_refused() {
        let dir = tempdir().unwrap();
        let a = write_file(dir.path(), "a.txt", b"a");
        let fm = FileManager::new(MemoryCatalog::without_unique_index(), MemoryBlobStore::new());

        // Second writer slipped past the existence check
        let first = fm.upload_file(&a, Some("dup")).unwrap();
        let second_id = fm.blobs().put("dup", b"b").unwrap();
        fm.catalog()
            .insert(FileRecord::new(second_id, "dup", 1))
            .unwrap();

        let err = fm.delete_file("dup").unwrap_err();
        assert!(matches!(err, Error::DuplicateRecord(ref name) if name == "dup"));
        assert_eq!(fm.count().unwrap(), 2);
        assert!(fm.blobs().contains(&first.id));
        assert!(fm.blobs().contains(&second_id));
    }

    #[test]
    fn test_list_files_half_open_range() {
        let fm = FileManager::in_memory();
        let t0 = Utc::now() - Duration::hours(1);
        let t1 = t0 + Duration::minutes(10);

        for (name, at) in [
            ("before", t0 - Duration::seconds(1)),
            ("at-begin", t0),
            ("inside", t0 + Duration::minutes(5)),
            ("at-end", t1),
        ] {
            let record = FileRecord::with_upload_time(BlobId::generate(name), name, 0, at);
            fm.catalog().insert(record).unwrap();
        }

        let mut names: Vec<_> = fm
            .list_files(t0, Some(t1))
            .unwrap()
            .into_iter()
            .map(|r| r.filename)
            .collect();
        names.sort();
        assert_eq!(names, vec!["at-begin", "inside"]);

        assert!(fm
            .list_files(t1 + Duration::hours(5), None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_list_files_end_defaults_to_now() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "recent.txt", b"r");
        let fm = FileManager::in_memory();
        let begin = Utc::now() - Duration::seconds(1);

        fm.upload_file(&path, None).unwrap();

        let listed = fm.list_files(begin, None).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].filename, "recent.txt");
    }
}
