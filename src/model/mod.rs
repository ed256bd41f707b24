//! Core data types for filebucket

mod id;
mod record;

pub use id::BlobId;
pub use record::FileRecord;
