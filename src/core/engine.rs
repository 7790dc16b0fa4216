//! Catalog engine wiring.
//!
//! [`CatalogEngine`] owns handles to the two record stores, the keyword
//! search primitive and the blob store. Its operations are split across
//! sibling modules:
//! - `categories`: category writes and the delete guard
//! - `items`: item writes, publishing, engagement, uploads
//! - `queries`: read-only views and statistics

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::adapters::{BlobStore, FsBlobStore, KeywordSearch, MemoryBlobStore};
use crate::config::{QuerySettings, ResolvedConfig};
use crate::domain::{Category, LibraryItem};
use crate::error::{CatalogError, CatalogResult};
use crate::store::{CategoryOrder, MemoryStore, RecordStore, SqliteStore};

use super::uploads::UploadPolicy;

/// Entry point for every catalog operation
///
/// Cheap to share behind an `Arc`; all state lives in the stores.
pub struct CatalogEngine {
    pub(crate) categories: Arc<dyn RecordStore<Category>>,
    pub(crate) items: Arc<dyn RecordStore<LibraryItem>>,
    pub(crate) search: Arc<dyn KeywordSearch>,
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) uploads: UploadPolicy,
    pub(crate) queries: QuerySettings,
}

impl CatalogEngine {
    pub fn new(
        categories: Arc<dyn RecordStore<Category>>,
        items: Arc<dyn RecordStore<LibraryItem>>,
        search: Arc<dyn KeywordSearch>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            categories,
            items,
            search,
            blobs,
            uploads: UploadPolicy::default(),
            queries: QuerySettings::default(),
        }
    }

    /// Build over a single backend that serves both tables and search
    pub fn from_store<S>(store: Arc<S>, blobs: Arc<dyn BlobStore>) -> Self
    where
        S: RecordStore<Category> + RecordStore<LibraryItem> + KeywordSearch + 'static,
    {
        let categories: Arc<dyn RecordStore<Category>> = store.clone();
        let items: Arc<dyn RecordStore<LibraryItem>> = store.clone();
        let search: Arc<dyn KeywordSearch> = store;
        Self::new(categories, items, search, blobs)
    }

    /// Fully in-memory engine (for tests and embedding)
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()), Arc::new(MemoryBlobStore::new()))
    }

    /// Engine over the SQLite database and blob directory named by a config
    pub async fn open(config: &ResolvedConfig) -> CatalogResult<Self> {
        if let Some(parent) = config.database.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let store = SqliteStore::open(&config.database)?;
        let blobs = FsBlobStore::open(&config.blobs).await?;
        info!(
            database = %config.database.display(),
            blobs = %config.blobs.display(),
            "Opened catalog"
        );

        Ok(Self::from_store(Arc::new(store), Arc::new(blobs))
            .with_upload_policy(config.uploads.clone())
            .with_query_settings(config.queries.clone()))
    }

    pub fn with_upload_policy(mut self, policy: UploadPolicy) -> Self {
        self.uploads = policy;
        self
    }

    pub fn with_query_settings(mut self, settings: QuerySettings) -> Self {
        self.queries = settings;
        self
    }

    pub fn upload_policy(&self) -> &UploadPolicy {
        &self.uploads
    }

    pub fn query_settings(&self) -> &QuerySettings {
        &self.queries
    }

    /// Entire category table in store order
    pub(crate) async fn category_snapshot(&self) -> CatalogResult<Vec<Category>> {
        self.categories.scan_all(CategoryOrder::Insertion).await
    }

    pub(crate) async fn require_category(&self, id: Uuid) -> CatalogResult<Category> {
        self.categories
            .get(id)
            .await?
            .ok_or_else(|| CatalogError::category_not_found(id))
    }

    pub(crate) async fn require_item(&self, id: Uuid) -> CatalogResult<LibraryItem> {
        self.items
            .get(id)
            .await?
            .ok_or_else(|| CatalogError::item_not_found(id))
    }
}

/// Per-record results of a bulk operation.
///
/// Bulk operations never abort on the first failure; every input gets an
/// entry, keyed by its id (or its position for creates).
#[derive(Debug)]
pub struct BulkOutcome<K, T> {
    pub outcomes: Vec<(K, CatalogResult<T>)>,
}

impl<K, T> Default for BulkOutcome<K, T> {
    fn default() -> Self {
        Self {
            outcomes: Vec::new(),
        }
    }
}

impl<K, T> BulkOutcome<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: K, result: CatalogResult<T>) {
        self.outcomes.push((key, result));
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (&K, &T)> {
        self.outcomes
            .iter()
            .filter_map(|(k, r)| r.as_ref().ok().map(|v| (k, v)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&K, &CatalogError)> {
        self.outcomes
            .iter()
            .filter_map(|(k, r)| r.as_ref().err().map(|e| (k, e)))
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    /// True when every record succeeded
    pub fn is_complete(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Successful values in input order
    pub fn into_successes(self) -> Vec<T> {
        self.outcomes
            .into_iter()
            .filter_map(|(_, r)| r.ok())
            .collect()
    }
}
