//! Storage configuration
//!
//! Read from ~/.config/filebucket/config.json when present. Every field is
//! optional in the file; missing ones take their defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "filebucket";

/// Where the catalog and blob store live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory for all storage
    pub root: PathBuf,
    /// Database directory holding the catalog collection
    pub catalog_db: String,
    /// Catalog collection name
    pub catalog_collection: String,
    /// Database directory holding bucket files
    pub blob_db: String,
    /// Bucket name
    pub bucket: String,
}

impl Default for Config {
    fn default() -> Self {
        let root = dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from(".filebucket"));

        Config {
            root,
            catalog_db: "FileInfo".to_string(),
            catalog_collection: "FileInfo".to_string(),
            blob_db: "FileBucket".to_string(),
            bucket: "DEFAULT_BUCKET".to_string(),
        }
    }
}

impl Config {
    /// Config rooted at `root` with default names
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Config {
            root: root.into(),
            ..Config::default()
        }
    }

    /// Default config file path (~/.config/filebucket/config.json)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.json"))
    }

    /// Load from a specific file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Load from `path` if given, else the default file if it exists, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(default) if default.exists() => Self::from_file(default),
            _ => Ok(Config::default()),
        }
    }

    /// Path of the catalog collection file
    pub fn catalog_path(&self) -> PathBuf {
        self.root
            .join(&self.catalog_db)
            .join(format!("{}.json", self.catalog_collection))
    }

    /// Path of the bucket file
    pub fn bucket_path(&self) -> PathBuf {
        self.root
            .join(&self.blob_db)
            .join(format!("{}.blobs", self.bucket))
    }
}
