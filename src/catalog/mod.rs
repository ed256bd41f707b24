//! Metadata catalog
//!
//! Maps logical filenames to blob ids and file attributes.

mod json;
mod memory;
mod traits;

pub use json::JsonCatalog;
pub use memory::MemoryCatalog;
pub use traits::Catalog;
