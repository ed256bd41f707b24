//! # filebucket
//!
//! A filename-indexed metadata catalog layered over a binary blob store.
//!
//! Files are uploaded under a logical name. The catalog records the name,
//! upload time, size and the blob id; the bytes themselves live in a blob
//! store. Lookups go by name or by upload-time range.
//!
//! ## Core Concepts
//!
//! - **Catalog**: document collection of [`FileRecord`]s, unique on filename
//! - **Blob Store**: whole-object byte storage addressed by opaque [`BlobId`]
//! - **FileManager**: keeps the two in step on upload and delete
//!
//! ## Example
//!
//! ```ignore
//! use filebucket::{Config, FileManager};
//!
//! let fm = FileManager::open(&Config::default())?;
//! fm.upload_file("notes.txt", None)?;
//! let bytes = fm.download_file("notes.txt")?;
//! ```

pub mod catalog;
pub mod model;
pub mod store;

mod config;
mod error;
mod manager;

pub use catalog::{Catalog, JsonCatalog, MemoryCatalog};
pub use config::Config;
pub use error::{Error, Result};
pub use manager::FileManager;
pub use model::{BlobId, FileRecord};
pub use store::{BlobStore, FileBlobStore, MemoryBlobStore};

/// Bucket file format version
pub const VERSION: u32 = 1;

/// Magic bytes for bucket file identification
pub const MAGIC: &[u8; 8] = b"FBUCKET\0";
