//! FileRecord - one catalog entry describing a stored file

use super::BlobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for a single stored file
///
/// Records are created once at upload and never mutated. The `id` is the
/// blob store key holding the file's bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Blob store identifier
    pub id: BlobId,
    /// Logical name, unique among live records
    pub filename: String,
    /// UTC wall-clock time the upload was recorded
    pub upload_time: DateTime<Utc>,
    /// Payload length in bytes
    pub file_size: u64,
}

impl FileRecord {
    /// Create a record stamped with the current time
    pub fn new(id: BlobId, filename: impl Into<String>, file_size: u64) -> Self {
        Self::with_upload_time(id, filename, file_size, Utc::now())
    }

    /// Create a record with an explicit upload time
    pub fn with_upload_time(
        id: BlobId,
        filename: impl Into<String>,
        file_size: u64,
        upload_time: DateTime<Utc>,
    ) -> Self {
        FileRecord {
            id,
            filename: filename.into(),
            upload_time,
            file_size,
        }
    }

    /// Whether `upload_time` lies in `[begin, end)`
    pub fn uploaded_between(&self, begin: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.upload_time >= begin && self.upload_time < end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_uploaded_between_is_half_open() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(10);
        let id = BlobId::generate("a");

        assert!(FileRecord::with_upload_time(id, "a", 1, t0).uploaded_between(t0, t1));
        assert!(!FileRecord::with_upload_time(id, "a", 1, t1).uploaded_between(t0, t1));
        assert!(!FileRecord::with_upload_time(id, "a", 1, t0 - Duration::nanoseconds(1))
            .uploaded_between(t0, t1));
    }

    #[test]
    fn test_json_field_names() {
        let record = FileRecord::new(BlobId::from_bytes([1; 32]), "notes.txt", 42);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["filename"], "notes.txt");
        assert_eq!(value["file_size"], 42);
        assert!(value["upload_time"].is_string());
        assert_eq!(value["id"], "01".repeat(32));
    }
}
