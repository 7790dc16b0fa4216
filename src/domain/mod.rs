//! Domain types for the catalog.
//!
//! This module contains the core data structures:
//! - Category: taxonomy node with a weak parent reference
//! - LibraryItem: catalog content with lifecycle and engagement data

pub mod category;
pub mod item;

// Re-export commonly used types
pub use category::{normalize_name, Category, CategoryDraft, CategoryNode};
pub use item::{
    EngagementCounter, FilePayload, ItemDraft, ItemStatistics, ItemType, LibraryItem, Metadata,
    UploadDefaults, DEFAULT_LANGUAGE,
};
