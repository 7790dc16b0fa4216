//! Error types for the catalog engine.
//!
//! Every public operation returns [`CatalogResult`]. Variants carry the
//! offending id or name so callers can render a user-facing message.

use thiserror::Error;
use uuid::Uuid;

/// Result alias used throughout the library
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors surfaced by the catalog engine and its stores
#[derive(Debug, Error)]
pub enum CatalogError {
    // ========== Lookup ==========
    /// Unknown category, item or blob
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    // ========== Hierarchy ==========
    /// Another category already uses this name (case-insensitive)
    #[error("category with name '{0}' already exists")]
    DuplicateName(String),

    /// Parent is missing or is the category itself
    #[error("invalid parent {parent_id} for category {id}: {reason}")]
    InvalidParent {
        id: Uuid,
        parent_id: Uuid,
        reason: &'static str,
    },

    /// Assigning the parent would close a loop in the parent chain
    #[error("circular reference: setting parent of {id} to {parent_id} creates a cycle")]
    CircularReference { id: Uuid, parent_id: Uuid },

    // ========== Delete guard ==========
    #[error("cannot delete category {id}: it still has {count} subcategories")]
    HasSubcategories { id: Uuid, count: usize },

    #[error("cannot delete category {id}: it still has {count} library items")]
    HasItems { id: Uuid, count: usize },

    // ========== Input / backend ==========
    /// Malformed input
    #[error("validation failed: {0}")]
    Validation(String),

    /// Record store or blob backend unreachable
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl CatalogError {
    pub fn category_not_found(id: Uuid) -> Self {
        Self::NotFound {
            kind: "category",
            id: id.to_string(),
        }
    }

    pub fn item_not_found(id: Uuid) -> Self {
        Self::NotFound {
            kind: "library item",
            id: id.to_string(),
        }
    }

    pub fn blob_not_found(reference: &str) -> Self {
        Self::NotFound {
            kind: "blob",
            id: reference.to_string(),
        }
    }

    /// True for the kinds that mean "the caller referenced something unknown"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StorageUnavailable(format!("sqlite: {}", e))
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(e: std::io::Error) -> Self {
        Self::StorageUnavailable(format!("io: {}", e))
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        Self::StorageUnavailable(format!("corrupt record encoding: {}", e))
    }
}
