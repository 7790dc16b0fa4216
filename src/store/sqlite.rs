//! SQLite-backed record store.
//!
//! One table per record kind. Filterable fields are mirrored into indexed
//! columns; the full record is kept as a JSON `body`. All access goes
//! through a single connection behind a mutex, so `modify` is a
//! transaction that no other caller can interleave with. Statements run on
//! the blocking pool, never on an async worker.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::{sort_records, CategoryFilter, ItemFilter, Mutation, Record, RecordStore};
use crate::adapters::KeywordSearch;
use crate::domain::{normalize_name, Category, LibraryItem};
use crate::error::{CatalogError, CatalogResult};

/// SQLite connection settings
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to database file (or ":memory:")
    pub path: String,

    /// Enable WAL mode for concurrent readers
    pub wal_mode: bool,

    /// Busy timeout in milliseconds
    pub busy_timeout_ms: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "marinelib.db".to_string(),
            wal_mode: true,
            busy_timeout_ms: 5000,
        }
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    name_key TEXT NOT NULL,
    parent_id TEXT,
    is_active INTEGER NOT NULL,
    display_order INTEGER NOT NULL,
    body TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_categories_name_key ON categories(name_key);
CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent_id);
CREATE INDEX IF NOT EXISTS idx_categories_active ON categories(is_active);

CREATE TABLE IF NOT EXISTS library_items (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    category_id TEXT,
    item_type TEXT NOT NULL,
    language TEXT NOT NULL,
    difficulty INTEGER,
    is_published INTEGER NOT NULL,
    is_featured INTEGER NOT NULL,
    author TEXT,
    created_by TEXT NOT NULL,
    body TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_category ON library_items(category_id);
CREATE INDEX IF NOT EXISTS idx_items_type ON library_items(item_type);
CREATE INDEX IF NOT EXISTS idx_items_published ON library_items(is_published);
"#;

/// Table mapping for a record kind
pub trait SqlRecord: Record + Serialize + DeserializeOwned {
    const TABLE: &'static str;

    /// Indexed columns mirrored from the record, excluding `id` and `body`
    const COLUMNS: &'static [&'static str];

    /// Values for `COLUMNS`, in the same order
    fn column_values(&self) -> Vec<Value>;

    /// WHERE clause (without the keyword) and its bound parameters
    fn filter_clause(filter: &Self::Filter) -> (String, Vec<Value>);
}

fn text(s: impl Into<String>) -> Value {
    Value::Text(s.into())
}

fn flag(b: bool) -> Value {
    Value::Integer(i64::from(b))
}

fn opt_text(s: Option<impl Into<String>>) -> Value {
    s.map(|v| Value::Text(v.into())).unwrap_or(Value::Null)
}

const TAG_CLAUSE: &str =
    "EXISTS (SELECT 1 FROM json_each(body, '$.tags') WHERE json_each.value = ?)";

impl SqlRecord for Category {
    const TABLE: &'static str = "categories";
    const COLUMNS: &'static [&'static str] = &["name_key", "parent_id", "is_active", "display_order"];

    fn column_values(&self) -> Vec<Value> {
        vec![
            text(self.name_key()),
            opt_text(self.parent_id.map(|p| p.to_string())),
            flag(self.is_active),
            Value::Integer(self.display_order),
        ]
    }

    fn filter_clause(filter: &CategoryFilter) -> (String, Vec<Value>) {
        match filter {
            CategoryFilter::Active(active) => ("is_active = ?".into(), vec![flag(*active)]),
            CategoryFilter::Parent(id) => ("parent_id = ?".into(), vec![text(id.to_string())]),
            CategoryFilter::TopLevel => ("parent_id IS NULL".into(), vec![]),
            CategoryFilter::NameEquals(name) => {
                ("name_key = ?".into(), vec![text(normalize_name(name))])
            }
            CategoryFilter::NameContains(fragment) => (
                "instr(name_key, ?) > 0".into(),
                vec![text(normalize_name(fragment))],
            ),
            CategoryFilter::Tag(tag) => (TAG_CLAUSE.into(), vec![text(tag.clone())]),
        }
    }
}

impl SqlRecord for LibraryItem {
    const TABLE: &'static str = "library_items";
    const COLUMNS: &'static [&'static str] = &[
        "category_id",
        "item_type",
        "language",
        "difficulty",
        "is_published",
        "is_featured",
        "author",
        "created_by",
    ];

    fn column_values(&self) -> Vec<Value> {
        vec![
            opt_text(self.category_id.map(|c| c.to_string())),
            text(self.item_type.as_str()),
            text(self.language.clone()),
            self.difficulty
                .map(|d| Value::Integer(i64::from(d)))
                .unwrap_or(Value::Null),
            flag(self.is_published),
            flag(self.is_featured),
            opt_text(self.author.clone()),
            text(self.created_by.clone()),
        ]
    }

    fn filter_clause(filter: &ItemFilter) -> (String, Vec<Value>) {
        match filter {
            ItemFilter::Category(id) => ("category_id = ?".into(), vec![text(id.to_string())]),
            ItemFilter::Type(t) => ("item_type = ?".into(), vec![text(t.as_str())]),
            ItemFilter::Tag(tag) => (TAG_CLAUSE.into(), vec![text(tag.clone())]),
            ItemFilter::AllTags(tags) if tags.is_empty() => ("1 = 1".into(), vec![]),
            ItemFilter::AllTags(tags) => (
                vec![TAG_CLAUSE; tags.len()].join(" AND "),
                tags.iter().cloned().map(text).collect(),
            ),
            ItemFilter::Language(lang) => ("language = ?".into(), vec![text(lang.clone())]),
            ItemFilter::Difficulty(d) => {
                ("difficulty = ?".into(), vec![Value::Integer(i64::from(*d))])
            }
            ItemFilter::Published(p) => ("is_published = ?".into(), vec![flag(*p)]),
            ItemFilter::Featured => ("is_published = 1 AND is_featured = 1".into(), vec![]),
            ItemFilter::Author(author) => ("author = ?".into(), vec![text(author.clone())]),
            ItemFilter::CreatedBy(actor) => ("created_by = ?".into(), vec![text(actor.clone())]),
        }
    }
}

/// Persistent store over a single SQLite database
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let config = SqliteConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        };
        Self::with_config(config)
    }

    /// In-memory database (for testing)
    pub fn in_memory() -> CatalogResult<Self> {
        Self::with_config(SqliteConfig {
            path: ":memory:".to_string(),
            wal_mode: false,
            ..Default::default()
        })
    }

    pub fn with_config(config: SqliteConfig) -> CatalogResult<Self> {
        let conn = Connection::open(&config.path).map_err(|e| {
            CatalogError::StorageUnavailable(format!("failed to open {}: {}", config.path, e))
        })?;

        if config.wal_mode {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }
        conn.pragma_update(None, "busy_timeout", config.busy_timeout_ms)?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(SCHEMA_SQL)?;

        debug!(path = %config.path, "Opened SQLite catalog store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a synchronous operation on the connection off the async runtime
    async fn with_conn<T, F>(&self, op: F) -> CatalogResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> CatalogResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| CatalogError::StorageUnavailable("connection lock poisoned".into()))?;
            op(&mut guard)
        })
        .await
        .map_err(|e| CatalogError::StorageUnavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

fn decode<R: SqlRecord>(body: &str) -> CatalogResult<R> {
    Ok(serde_json::from_str(body)?)
}

fn upsert_sql<R: SqlRecord>() -> String {
    let columns = R::COLUMNS.join(", ");
    let placeholders = vec!["?"; R::COLUMNS.len() + 2].join(", ");
    let updates = R::COLUMNS
        .iter()
        .chain(std::iter::once(&"body"))
        .map(|c| format!("{c} = excluded.{c}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} (id, {}, body) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {}",
        R::TABLE,
        columns,
        placeholders,
        updates
    )
}

fn write_record<R: SqlRecord>(conn: &Connection, record: &R) -> CatalogResult<()> {
    let mut values = Vec::with_capacity(R::COLUMNS.len() + 2);
    values.push(text(record.id().to_string()));
    values.extend(record.column_values());
    values.push(text(serde_json::to_string(record)?));

    conn.execute(&upsert_sql::<R>(), params_from_iter(values))?;
    Ok(())
}

fn read_record<R: SqlRecord>(conn: &Connection, id: Uuid) -> CatalogResult<Option<R>> {
    let sql = format!("SELECT body FROM {} WHERE id = ?1", R::TABLE);
    let body: Option<String> = conn
        .query_row(&sql, params![id.to_string()], |row| row.get(0))
        .optional()?;
    body.as_deref().map(decode).transpose()
}

fn query_records<R: SqlRecord>(
    conn: &Connection,
    clause: &str,
    values: Vec<Value>,
) -> CatalogResult<Vec<R>> {
    let sql = format!("SELECT body FROM {} WHERE {} ORDER BY seq", R::TABLE, clause);
    let mut stmt = conn.prepare(&sql)?;
    let bodies = stmt
        .query_map(params_from_iter(values), |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    bodies.iter().map(|b| decode(b)).collect()
}

#[async_trait]
impl<R: SqlRecord> RecordStore<R> for SqliteStore {
    async fn get(&self, id: Uuid) -> CatalogResult<Option<R>> {
        self.with_conn(move |conn| read_record(conn, id)).await
    }

    async fn put(&self, record: R) -> CatalogResult<R> {
        self.with_conn(move |conn| {
            write_record(conn, &record)?;
            Ok(record)
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> CatalogResult<bool> {
        self.with_conn(move |conn| {
            let sql = format!("DELETE FROM {} WHERE id = ?1", R::TABLE);
            Ok(conn.execute(&sql, params![id.to_string()])? > 0)
        })
        .await
    }

    async fn scan(&self, filter: &R::Filter) -> CatalogResult<Vec<R>> {
        let (clause, values) = R::filter_clause(filter);
        self.with_conn(move |conn| query_records(conn, &clause, values))
            .await
    }

    async fn scan_all(&self, order: R::Order) -> CatalogResult<Vec<R>> {
        let mut records = self
            .with_conn(|conn| query_records::<R>(conn, "1 = 1", Vec::new()))
            .await?;
        sort_records(&mut records, order);
        Ok(records)
    }

    async fn count(&self, filter: &R::Filter) -> CatalogResult<usize> {
        let (clause, values) = R::filter_clause(filter);
        self.with_conn(move |conn| {
            let sql = format!("SELECT COUNT(*) FROM {} WHERE {}", R::TABLE, clause);
            let count: i64 = conn.query_row(&sql, params_from_iter(values), |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    async fn batch_put(&self, records: Vec<R>) -> CatalogResult<Vec<R>> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            for record in &records {
                write_record(&tx, record)?;
            }
            tx.commit()?;
            Ok(records)
        })
        .await
    }

    async fn batch_delete(&self, ids: &[Uuid]) -> CatalogResult<usize> {
        let ids = ids.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let sql = format!("DELETE FROM {} WHERE id = ?1", R::TABLE);
            let mut removed = 0;
            for id in &ids {
                removed += tx.execute(&sql, params![id.to_string()])?;
            }
            tx.commit()?;
            Ok(removed)
        })
        .await
    }

    async fn modify(&self, id: Uuid, mutation: Mutation<R>) -> CatalogResult<Option<R>> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let Some(mut record) = read_record::<R>(&tx, id)? else {
                return Ok(None);
            };
            // Dropping `tx` on error rolls back
            mutation(&mut record)?;
            write_record(&tx, &record)?;
            tx.commit()?;

            Ok(Some(record))
        })
        .await
    }
}

#[async_trait]
impl KeywordSearch for SqliteStore {
    async fn search_by_keyword(&self, text: &str) -> CatalogResult<Vec<Uuid>> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let ids = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id FROM library_items WHERE \
                     instr(lower(json_extract(body, '$.title')), ?1) > 0 \
                     OR instr(lower(COALESCE(json_extract(body, '$.description'), '')), ?1) > 0 \
                     OR instr(lower(COALESCE(author, '')), ?1) > 0 \
                     OR EXISTS (SELECT 1 FROM json_each(body, '$.tags') \
                                WHERE instr(lower(json_each.value), ?1) > 0) \
                     ORDER BY seq",
                )?;
                let ids = stmt
                    .query_map(params![needle], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ids)
            })
            .await?;

        ids.iter()
            .map(|id| {
                Uuid::parse_str(id).map_err(|e| {
                    CatalogError::StorageUnavailable(format!("corrupt item id {}: {}", id, e))
                })
            })
            .collect()
    }
}
