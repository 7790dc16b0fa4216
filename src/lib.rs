//! marinelib - Category hierarchy and catalog engine
//!
//! Maintains the topic taxonomy and the educational content library of a
//! marine monitoring platform.
//!
//! # Architecture
//!
//! Reads flow from the stores through the query layer; every write flows
//! through the engine and the hierarchy validator:
//! - Categories form a forest: no cycles, no self-parenting, unique names
//! - Deleting a category requires that nothing depends on it
//! - Engagement counters are atomic read-modify-writes at the store level
//!
//! # Modules
//!
//! - `adapters`: Blob storage and keyword search interfaces
//! - `core`: Engine, validator, queries and upload policy
//! - `domain`: Data structures (Category, LibraryItem)
//! - `store`: Record stores (memory, SQLite)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Build a small hierarchy
//! marinelib category add Ocean
//! marinelib category add Reef --parent Ocean
//!
//! # Add and publish an item
//! marinelib item add "Bleaching primer" --type guide --category Reef
//! marinelib item publish <item-id>
//!
//! marinelib category tree
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod store;

// Re-export main types at crate root for convenience
pub use crate::core::{BulkOutcome, CatalogEngine, CategoryStatistics, UploadPolicy};
pub use crate::domain::{Category, CategoryDraft, CategoryNode, ItemDraft, ItemType, LibraryItem};
pub use crate::error::{CatalogError, CatalogResult};
pub use crate::store::{MemoryStore, RecordStore, SqliteStore};
