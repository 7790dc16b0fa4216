//! In-process record store.
//!
//! Each table sits behind its own `RwLock`; `modify` holds the write lock for
//! the whole read-modify-write, so concurrent increments never lose updates.
//! Iteration order is insertion order.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use super::{sort_records, Mutation, Record, RecordStore};
use crate::adapters::KeywordSearch;
use crate::domain::{Category, LibraryItem};
use crate::error::{CatalogError, CatalogResult};

use self::table::{HasTable, Table};

mod table {
    use std::collections::HashMap;
    use std::sync::RwLock;

    use uuid::Uuid;

    use crate::store::Record;

    /// Rows plus the order they were first inserted in
    pub struct Table<R> {
        pub(super) rows: HashMap<Uuid, R>,
        pub(super) order: Vec<Uuid>,
    }

    impl<R: Record> Table<R> {
        pub fn upsert(&mut self, record: R) {
            let id = record.id();
            if self.rows.insert(id, record).is_none() {
                self.order.push(id);
            }
        }

        pub fn remove(&mut self, id: &Uuid) -> bool {
            if self.rows.remove(id).is_some() {
                self.order.retain(|existing| existing != id);
                true
            } else {
                false
            }
        }

        pub fn iter(&self) -> impl Iterator<Item = &R> {
            self.order.iter().filter_map(|id| self.rows.get(id))
        }
    }

    impl<R> Default for Table<R> {
        fn default() -> Self {
            Self {
                rows: HashMap::new(),
                order: Vec::new(),
            }
        }
    }

    /// Routes a record kind to its table
    pub trait HasTable<R> {
        fn table(&self) -> &RwLock<Table<R>>;
    }
}

/// In-memory category and item tables
#[derive(Default)]
pub struct MemoryStore {
    categories: RwLock<Table<Category>>,
    items: RwLock<Table<LibraryItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HasTable<Category> for MemoryStore {
    fn table(&self) -> &RwLock<Table<Category>> {
        &self.categories
    }
}

impl HasTable<LibraryItem> for MemoryStore {
    fn table(&self) -> &RwLock<Table<LibraryItem>> {
        &self.items
    }
}

fn poisoned() -> CatalogError {
    CatalogError::StorageUnavailable("memory table lock poisoned".to_string())
}

#[async_trait]
impl<R> RecordStore<R> for MemoryStore
where
    R: Record,
    MemoryStore: HasTable<R>,
{
    async fn get(&self, id: Uuid) -> CatalogResult<Option<R>> {
        let table = self.table().read().map_err(|_| poisoned())?;
        Ok(table.rows.get(&id).cloned())
    }

    async fn put(&self, record: R) -> CatalogResult<R> {
        let mut table = self.table().write().map_err(|_| poisoned())?;
        table.upsert(record.clone());
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> CatalogResult<bool> {
        let mut table = self.table().write().map_err(|_| poisoned())?;
        Ok(table.remove(&id))
    }

    async fn scan(&self, filter: &R::Filter) -> CatalogResult<Vec<R>> {
        let table = self.table().read().map_err(|_| poisoned())?;
        Ok(table.iter().filter(|r| r.matches(filter)).cloned().collect())
    }

    async fn scan_all(&self, order: R::Order) -> CatalogResult<Vec<R>> {
        let mut records: Vec<R> = {
            let table = self.table().read().map_err(|_| poisoned())?;
            table.iter().cloned().collect()
        };
        sort_records(&mut records, order);
        Ok(records)
    }

    async fn count(&self, filter: &R::Filter) -> CatalogResult<usize> {
        let table = self.table().read().map_err(|_| poisoned())?;
        Ok(table.iter().filter(|r| r.matches(filter)).count())
    }

    async fn batch_put(&self, records: Vec<R>) -> CatalogResult<Vec<R>> {
        let mut table = self.table().write().map_err(|_| poisoned())?;
        for record in &records {
            table.upsert(record.clone());
        }
        Ok(records)
    }

    async fn batch_delete(&self, ids: &[Uuid]) -> CatalogResult<usize> {
        let mut table = self.table().write().map_err(|_| poisoned())?;
        Ok(ids.iter().filter(|id| table.remove(id)).count())
    }

    async fn modify(&self, id: Uuid, mutation: Mutation<R>) -> CatalogResult<Option<R>> {
        let mut table = self.table().write().map_err(|_| poisoned())?;
        let Some(current) = table.rows.get(&id) else {
            return Ok(None);
        };

        let mut updated = current.clone();
        mutation(&mut updated)?;
        table.rows.insert(id, updated.clone());
        Ok(Some(updated))
    }
}

#[async_trait]
impl KeywordSearch for MemoryStore {
    async fn search_by_keyword(&self, text: &str) -> CatalogResult<Vec<Uuid>> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let table = self.items.read().map_err(|_| poisoned())?;
        Ok(table
            .iter()
            .filter(|item| item.matches_keyword(&needle))
            .map(|item| item.id)
            .collect())
    }
}
