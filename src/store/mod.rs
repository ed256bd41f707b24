//! Blob storage
//!
//! Raw file bytes live in a blob store, addressed by opaque [`BlobId`]s.
//! On disk each bucket is a single file of zstd-compressed, checksummed blobs.
//!
//! [`BlobId`]: crate::model::BlobId

mod blob;
mod file_store;
mod memory;
mod traits;

pub use blob::Blob;
pub use file_store::FileBlobStore;
pub use memory::MemoryBlobStore;
pub use traits::BlobStore;
