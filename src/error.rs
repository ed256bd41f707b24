//! Error types for filebucket

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for filebucket operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in filebucket operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("'{0}' already exists")]
    AlreadyExists(String),

    #[error("more than one file found with name {0}")]
    DuplicateRecord(String),

    #[error("Failed to read {}: {source}", path.display())]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Duplicate key on unique index '{field}': {value}")]
    DuplicateKey { field: &'static str, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Invalid blob file: {0}")]
    InvalidFile(String),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Config error: {0}")]
    Config(String),
}
