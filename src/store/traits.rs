//! Blob store trait definition

use crate::model::BlobId;
use crate::Result;

/// Trait for whole-object byte storage addressed by opaque id
///
/// Implementations can be:
/// - Single-file stores on local disk
/// - In-memory maps for testing
/// - Clients for remote large-object services
pub trait BlobStore: Send + Sync {
    /// Store `data` under a descriptive `name`, returning a freshly minted id
    fn put(&self, name: &str, data: &[u8]) -> Result<BlobId>;

    /// Fetch the full contents of an object
    fn get(&self, id: &BlobId) -> Result<Vec<u8>>;

    /// Remove an object
    fn delete(&self, id: &BlobId) -> Result<()>;

    /// Check if an object exists
    fn contains(&self, id: &BlobId) -> bool;

    /// Number of live objects
    fn object_count(&self) -> usize;
}
