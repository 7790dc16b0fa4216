//! Record stores for categories and library items.
//!
//! The engine talks to storage only through [`RecordStore`]. Two backends
//! are provided:
//! - [`MemoryStore`]: in-process tables, used by tests and embedders
//! - [`SqliteStore`]: persistent tables in a single SQLite file
//!
//! Both guarantee that [`RecordStore::modify`] is an atomic read-modify-write
//! of a single record, which is what engagement counters and audit re-stamps
//! rely on under concurrent callers.

pub mod filter;
pub mod memory;
pub mod sqlite;

use std::cmp::Ordering;
use std::fmt::Debug;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CatalogResult;

pub use filter::{CategoryFilter, CategoryOrder, ItemFilter, ItemOrder};
pub use memory::MemoryStore;
pub use sqlite::{SqliteConfig, SqliteStore};

/// A persisted record kind
pub trait Record: Clone + Debug + Send + Sync + 'static {
    /// Typed predicate understood by every backend
    type Filter: Debug + Send + Sync;

    /// Sort orders available to `scan_all`
    type Order: Copy + Debug + Send + Sync;

    /// Human-readable kind, used in errors and logs
    const KIND: &'static str;

    fn id(&self) -> Uuid;

    /// Evaluate a filter in memory
    fn matches(&self, filter: &Self::Filter) -> bool;

    /// Compare two records under an order. `Equal` keeps store order.
    fn compare(a: &Self, b: &Self, order: Self::Order) -> Ordering;
}

/// Single-record mutation applied atomically by [`RecordStore::modify`].
///
/// Returning an error aborts the write and leaves the record unchanged.
pub type Mutation<R> = Box<dyn FnOnce(&mut R) -> CatalogResult<()> + Send>;

/// Table of records keyed by id
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Point lookup
    async fn get(&self, id: Uuid) -> CatalogResult<Option<R>>;

    /// Insert or replace, returning the stored record
    async fn put(&self, record: R) -> CatalogResult<R>;

    /// Remove a record; false when it did not exist
    async fn delete(&self, id: Uuid) -> CatalogResult<bool>;

    /// Records matching a filter, in store iteration order
    async fn scan(&self, filter: &R::Filter) -> CatalogResult<Vec<R>>;

    /// Every record, sorted (stable) by `order`
    async fn scan_all(&self, order: R::Order) -> CatalogResult<Vec<R>>;

    async fn count(&self, filter: &R::Filter) -> CatalogResult<usize> {
        Ok(self.scan(filter).await?.len())
    }

    async fn batch_put(&self, records: Vec<R>) -> CatalogResult<Vec<R>>;

    /// Remove many records; returns how many existed
    async fn batch_delete(&self, ids: &[Uuid]) -> CatalogResult<usize>;

    /// Atomic read-modify-write of one record. `None` when the id is unknown.
    async fn modify(&self, id: Uuid, mutation: Mutation<R>) -> CatalogResult<Option<R>>;
}

/// Stable in-place sort shared by the backends
pub(crate) fn sort_records<R: Record>(records: &mut [R], order: R::Order) {
    records.sort_by(|a, b| R::compare(a, b, order));
}
