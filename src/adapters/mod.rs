//! Interfaces to external collaborators.
//!
//! The catalog engine does not own binary storage or search indexing; it
//! reaches them through the narrow traits defined here.

pub mod blob;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CatalogResult;

pub use blob::{FsBlobStore, MemoryBlobStore};

/// Key-value store for uploaded files
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return the reference to record on the item
    async fn store(&self, bytes: &[u8], suggested_name: Option<&str>) -> CatalogResult<String>;

    /// Load previously stored bytes
    async fn load(&self, reference: &str) -> CatalogResult<Vec<u8>>;

    /// Delete a blob; false when nothing was stored under the reference
    async fn delete(&self, reference: &str) -> CatalogResult<bool>;

    async fn exists(&self, reference: &str) -> CatalogResult<bool>;
}

/// Keyword search over library items
#[async_trait]
pub trait KeywordSearch: Send + Sync {
    /// Ids of items matching the keyword, unordered
    async fn search_by_keyword(&self, text: &str) -> CatalogResult<Vec<Uuid>>;
}
