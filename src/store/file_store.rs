//! Single-file blob store for one bucket
//!
//! File format:
//! ```text
//! [HEADER: 64 bytes]
//!   - magic: 8 bytes ("FBUCKET\0")
//!   - version: 4 bytes (u32 LE)
//!   - flags: 4 bytes
//!   - object_count: 8 bytes (u64 LE)
//!   - index_offset: 8 bytes (u64 LE)
//!   - reserved: 32 bytes
//!
//! [OBJECTS: variable]
//!   - framed blobs, concatenated
//!
//! [INDEX: variable]
//!   - sorted array of (id, offset, size) entries
//! ```
//!
//! Nothing already on disk is overwritten: new frames and each new index
//! are appended at the end of the file, and the header is pointed at the new
//! index only after it has been synced. A crash mid-mutation leaves the
//! previous header and index intact. Deleted objects and superseded indexes
//! stay in the file as dead space.

use super::{Blob, BlobStore};
use crate::model::BlobId;
use crate::{Error, Result, MAGIC, VERSION};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

const HEADER_SIZE: u64 = 64;

// 32 id + 8 offset + 4 size
const INDEX_ENTRY_SIZE: usize = 44;

/// Index entry for an object
#[derive(Clone, Debug)]
struct IndexEntry {
    offset: u64,
    size: u32,
}

/// A blob store backed by a single bucket file
pub struct FileBlobStore {
    /// Path to the bucket file
    path: PathBuf,
    /// The file handle
    file: RwLock<File>,
    /// In-memory index of live objects
    index: RwLock<HashMap<BlobId, IndexEntry>>,
    /// End of file, where the next frame or index goes
    write_offset: RwLock<u64>,
    /// Index changed since the last sync
    dirty: AtomicBool,
}

impl FileBlobStore {
    /// Create a new, empty bucket file
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        let mut header = [0u8; HEADER_SIZE as usize];
        header[0..8].copy_from_slice(MAGIC);
        header[8..12].copy_from_slice(&VERSION.to_le_bytes());
        file.write_all(&header)?;
        file.sync_all()?;

        tracing::debug!(path = %path.display(), "created bucket file");

        Ok(FileBlobStore {
            path,
            file: RwLock::new(file),
            index: RwLock::new(HashMap::new()),
            write_offset: RwLock::new(HEADER_SIZE),
            dirty: AtomicBool::new(false),
        })
    }

    /// Open an existing bucket file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)
            .map_err(|_| Error::InvalidFile("Truncated header".into()))?;

        if &header[0..8] != MAGIC {
            return Err(Error::InvalidFile("Invalid magic bytes".into()));
        }

        let version = le_u32(&header[8..12]);
        if version != VERSION {
            return Err(Error::VersionMismatch {
                expected: VERSION,
                found: version,
            });
        }

        let object_count = le_u64(&header[16..24]);
        let index_offset = le_u64(&header[24..32]);

        let mut index = HashMap::new();
        if index_offset > 0 && object_count > 0 {
            file.seek(SeekFrom::Start(index_offset))?;
            for _ in 0..object_count {
                let mut entry_buf = [0u8; INDEX_ENTRY_SIZE];
                file.read_exact(&mut entry_buf)?;

                let mut id_bytes = [0u8; 32];
                id_bytes.copy_from_slice(&entry_buf[0..32]);
                let id = BlobId::from_bytes(id_bytes);

                let offset = le_u64(&entry_buf[32..40]);
                let size = le_u32(&entry_buf[40..44]);

                index.insert(id, IndexEntry { offset, size });
            }
        }

        // Append past everything, including a torn tail from a crashed write
        let write_offset = file.seek(SeekFrom::End(0))?;

        tracing::debug!(
            path = %path.display(),
            objects = index.len(),
            "opened bucket file"
        );

        Ok(FileBlobStore {
            path,
            file: RwLock::new(file),
            index: RwLock::new(index),
            write_offset: RwLock::new(write_offset),
            dirty: AtomicBool::new(false),
        })
    }

    /// Open or create a bucket file, creating parent directories as needed
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::open(path)
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Self::create(path)
        }
    }

    /// Read the stored blob, including the name it was stored under
    pub fn get_blob(&self, id: &BlobId) -> Result<Blob> {
        let entry = {
            let index = self.index.read();
            index.get(id).cloned()
        };

        let entry = entry.ok_or_else(|| Error::NotFound(id.to_hex()))?;

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(entry.offset))?;

        let mut data = vec![0u8; entry.size as usize];
        file.read_exact(&mut data)?;

        Blob::decompress(&data)
    }

    /// Write the index to the end of the file, then point the header at it
    ///
    /// A no-op when nothing changed since the last sync.
    pub fn sync(&self) -> Result<()> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let result = self.write_index();
        if result.is_err() {
            self.dirty.store(true, Ordering::Release);
        }
        result
    }

    fn write_index(&self) -> Result<()> {
        let index = self.index.read();
        let mut write_offset = self.write_offset.write();
        let mut file = self.file.write();

        // Sort by id for determinism
        let mut entries: Vec<_> = index.iter().collect();
        entries.sort_by_key(|(id, _)| **id);

        let mut buf = Vec::with_capacity(entries.len() * INDEX_ENTRY_SIZE);
        for (id, entry) in entries {
            buf.extend_from_slice(id.as_bytes());
            buf.extend_from_slice(&entry.offset.to_le_bytes());
            buf.extend_from_slice(&entry.size.to_le_bytes());
        }

        let index_offset = *write_offset;
        file.seek(SeekFrom::Start(index_offset))?;
        file.write_all(&buf)?;
        *write_offset = index_offset + buf.len() as u64;
        file.sync_data()?;

        // Header flips only once the new index is durable
        file.seek(SeekFrom::Start(16))?;
        file.write_all(&(index.len() as u64).to_le_bytes())?;
        file.write_all(&index_offset.to_le_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// Append an encoded frame at the end of the file without indexing it
    fn append_frame(&self, framed: &[u8]) -> Result<IndexEntry> {
        let size = u32::try_from(framed.len())
            .map_err(|_| Error::InvalidFile(format!("object too large: {} bytes", framed.len())))?;

        let mut write_offset = self.write_offset.write();
        let offset = *write_offset;

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(framed)?;

        *write_offset = offset + size as u64;
        Ok(IndexEntry { offset, size })
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlobStore for FileBlobStore {
    fn put(&self, name: &str, data: &[u8]) -> Result<BlobId> {
        let id = BlobId::generate(name);
        let framed = Blob::new(name, data.to_vec()).compress()?;
        let entry = self.append_frame(&framed)?;

        self.index.write().insert(id, entry);
        self.dirty.store(true, Ordering::Release);
        self.sync()?;

        tracing::debug!(%id, name, bytes = data.len(), stored = framed.len(), "stored blob");
        Ok(id)
    }

    fn get(&self, id: &BlobId) -> Result<Vec<u8>> {
        Ok(self.get_blob(id)?.data)
    }

    fn delete(&self, id: &BlobId) -> Result<()> {
        self.index
            .write()
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.to_hex()))?;
        self.dirty.store(true, Ordering::Release);
        self.sync()?;

        tracing::debug!(%id, "deleted blob");
        Ok(())
    }

    fn contains(&self, id: &BlobId) -> bool {
        self.index.read().contains_key(id)
    }

    fn object_count(&self) -> usize {
        self.index.read().len()
    }
}

impl Drop for FileBlobStore {
    fn drop(&mut self) {
        // Best-effort retry of a failed index write
        let _ = self.sync();
    }
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

fn le_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_and_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bucket.blobs");

        {
            let store = FileBlobStore::create(&path).unwrap();
            assert_eq!(store.object_count(), 0);
        }

        {
            let store = FileBlobStore::open(&path).unwrap();
            assert_eq!(store.object_count(), 0);
        }
    }

    #[test]
    fn test_put_and_get() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::create(dir.path().join("bucket.blobs")).unwrap();

        let id = store.put("notes.txt", b"The cat sat on the mat").unwrap();
        assert_eq!(store.get(&id).unwrap(), b"The cat sat on the mat");

        let blob = store.get_blob(&id).unwrap();
        assert_eq!(blob.name, "notes.txt");
    }

    #[test]
    fn test_same_bytes_stored_twice() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::create(dir.path().join("bucket.blobs")).unwrap();

        let a = store.put("a", b"duplicate data").unwrap();
        let b = store.put("b", b"duplicate data").unwrap();

        assert_ne!(a, b);
        assert_eq!(store.object_count(), 2);

        store.delete(&a).unwrap();
        assert_eq!(store.get(&b).unwrap(), b"duplicate data");
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::create(dir.path().join("bucket.blobs")).unwrap();

        let id = store.put("gone", b"bytes").unwrap();
        store.delete(&id).unwrap();

        assert!(!store.contains(&id));
        assert!(matches!(store.get(&id), Err(Error::NotFound(_))));
        assert!(matches!(store.delete(&id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bucket.blobs");

        let (kept, removed);
        {
            let store = FileBlobStore::create(&path).unwrap();
            kept = store.put("kept", b"persistent bytes").unwrap();
            removed = store.put("removed", b"short lived").unwrap();
            store.delete(&removed).unwrap();
        }

        {
            let store = FileBlobStore::open(&path).unwrap();
            assert_eq!(store.object_count(), 1);
            assert_eq!(store.get(&kept).unwrap(), b"persistent bytes");
            assert!(!store.contains(&removed));

            // Appending after reopen must not clobber existing objects
            let later = store.put("later", b"appended").unwrap();
            assert_eq!(store.get(&kept).unwrap(), b"persistent bytes");
            assert_eq!(store.get(&later).unwrap(), b"appended");
        }
    }

    #[test]
    fn test_crash_before_index_update_keeps_existing_objects() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bucket.blobs");

        let kept;
        {
            let store = FileBlobStore::create(&path).unwrap();
            kept = store.put("kept", b"must survive").unwrap();
        }

        {
            // Frame lands on disk but the process dies before the index is written
            let store = FileBlobStore::open(&path).unwrap();
            let framed = Blob::new("lost", b"never indexed".to_vec())
                .compress()
                .unwrap();
            store.append_frame(&framed).unwrap();
            std::mem::forget(store);
        }

        let store = FileBlobStore::open(&path).unwrap();
        assert_eq!(store.object_count(), 1);
        assert_eq!(store.get(&kept).unwrap(), b"must survive");

        // The torn tail is skipped, not reused
        let next = store.put("next", b"after recovery").unwrap();
        assert_eq!(store.get(&kept).unwrap(), b"must survive");
        assert_eq!(store.get(&next).unwrap(), b"after recovery");
    }

    #[test]
    fn test_sync_without_changes_does_not_grow_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bucket.blobs");
        let store = FileBlobStore::create(&path).unwrap();
        store.put("a", b"abc").unwrap();

        let len = std::fs::metadata(&path).unwrap().len();
        store.sync().unwrap();
        store.sync().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), len);
    }

    #[test]
    fn test_open_rejects_foreign_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("not-a-bucket");
        std::fs::write(&path, vec![7u8; HEADER_SIZE as usize]).unwrap();

        assert!(matches!(
            FileBlobStore::open(&path),
            Err(Error::InvalidFile(_))
        ));
    }

    #[test]
    fn test_open_or_create_makes_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("FileBucket").join("DEFAULT_BUCKET.blobs");

        let store = FileBlobStore::open_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());
    }
}
