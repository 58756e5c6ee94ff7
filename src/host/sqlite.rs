use std::path::Path;
use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

use super::store::{
    DocData, DocId, Document, DocumentStore, FindQuery, PaginatedDocs, is_plain_identifier,
};
use crate::errors::StoreError;

/// Async-safe handle to the document database.
///
/// Wraps `SqliteDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O never
/// ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<SqliteDb>>,
}

impl DbHandle {
    pub fn new(db: SqliteDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    ///
    /// A closure that panicked earlier leaves the connection usable; the
    /// poisoned guard is taken over rather than failing every later call.
    pub async fn call<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&SqliteDb) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().unwrap_or_else(PoisonError::into_inner);
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// Documents of every collection live in one table; field data is a JSON
/// object in `data`.
pub struct SqliteDb {
    conn: Connection,
}

impl SqliteDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                data TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_collection
                ON documents(collection, created_at);
            ",
        )?;
        Ok(())
    }

    pub fn count(&self, collection: &str) -> Result<u64, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn find(&self, query: &FindQuery) -> Result<PaginatedDocs, StoreError> {
        let order_by = match &query.sort {
            Some(sort) => {
                let dir = if sort.descending { "DESC" } else { "ASC" };
                match sort.field.as_str() {
                    "createdAt" => format!("created_at {dir}, id {dir}"),
                    "id" => format!("id {dir}"),
                    field if is_plain_identifier(field) => {
                        // Ties keep insertion order regardless of direction.
                        format!("{} {dir}, id ASC", json_path(field))
                    }
                    field => return Err(StoreError::InvalidField(field.to_string())),
                }
            }
            None => "id ASC".to_string(),
        };

        let total = self.count(&query.collection)?;
        let page = query.page.max(1);
        let (limit, offset) = if query.limit == 0 {
            (-1i64, 0i64)
        } else {
            let limit = i64::from(query.limit);
            let offset = limit
                .checked_mul(i64::from(page - 1))
                .ok_or(StoreError::PageOutOfRange {
                    limit: query.limit,
                    page,
                })?;
            (limit, offset)
        };

        let sql = format!(
            "SELECT id, data, created_at FROM documents WHERE collection = ?1 ORDER BY {order_by} LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![query.collection, limit, offset], |row| {
            Ok(DocumentRow {
                id: row.get(0)?,
                data: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        let mut docs = Vec::new();
        for row in rows {
            docs.push(row?.into_document()?);
        }

        Ok(PaginatedDocs::new(docs, total, query.limit, page))
    }

    pub fn get(&self, collection: &str, id: i64) -> Result<Option<Document>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, data, created_at FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| {
                    Ok(DocumentRow {
                        id: row.get(0)?,
                        data: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        row.map(DocumentRow::into_document).transpose()
    }

    pub fn insert(&self, collection: &str, mut data: DocData) -> Result<Document, StoreError> {
        strip_system_fields(&mut data);
        let now = timestamp();
        self.conn.execute(
            "INSERT INTO documents (collection, data, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![collection, serde_json::to_string(&data)?, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get(collection, id)?
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: DocId::Int(id),
            })
    }

    pub fn update(
        &self,
        collection: &str,
        id: &DocId,
        mut data: DocData,
    ) -> Result<Document, StoreError> {
        let not_found = || StoreError::NotFound {
            collection: collection.to_string(),
            id: id.clone(),
        };
        let row_id = id.as_i64().ok_or_else(not_found)?;
        let mut doc = self.get(collection, row_id)?.ok_or_else(not_found)?;

        strip_system_fields(&mut data);
        doc.fields.extend(data);
        self.conn.execute(
            "UPDATE documents SET data = ?1, updated_at = ?2 WHERE collection = ?3 AND id = ?4",
            params![
                serde_json::to_string(&doc.fields)?,
                timestamp(),
                collection,
                row_id
            ],
        )?;
        Ok(doc)
    }

    /// Create an expression index for sorting on a data field.
    pub fn ensure_index(&self, field: &str) -> Result<(), StoreError> {
        if !is_plain_identifier(field) {
            return Err(StoreError::InvalidField(field.to_string()));
        }
        self.conn.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS idx_documents_field_{field} ON documents(collection, {})",
            json_path(field)
        ))?;
        Ok(())
    }
}

/// Must stay textually identical between `ensure_index` and `find` for
/// SQLite to use the expression index.
fn json_path(field: &str) -> String {
    format!("json_extract(data, '$.{field}')")
}

fn strip_system_fields(data: &mut DocData) {
    data.remove("id");
    data.remove("createdAt");
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

struct DocumentRow {
    id: i64,
    data: String,
    created_at: String,
}

impl DocumentRow {
    fn into_document(self) -> Result<Document, StoreError> {
        let fields = match serde_json::from_str::<Value>(&self.data)? {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::Corrupt {
                    id: self.id,
                    message: format!("expected a JSON object, found {}", other),
                });
            }
        };
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| StoreError::Corrupt {
                id: self.id,
                message: format!("invalid created_at '{}': {}", self.created_at, e),
            })?
            .with_timezone(&Utc);
        Ok(Document {
            id: DocId::Int(self.id),
            created_at,
            fields,
        })
    }
}

/// `DocumentStore` backed by SQLite.
#[derive(Clone)]
pub struct SqliteStore {
    db: DbHandle,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            db: DbHandle::new(SqliteDb::new(path)?),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            db: DbHandle::new(SqliteDb::new_in_memory()?),
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        let collection = collection.to_string();
        self.db.call(move |db| db.count(&collection)).await
    }

    async fn find(&self, query: &FindQuery) -> Result<PaginatedDocs, StoreError> {
        let query = query.clone();
        self.db.call(move |db| db.find(&query)).await
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &DocId,
    ) -> Result<Option<Document>, StoreError> {
        let Some(row_id) = id.as_i64() else {
            return Ok(None);
        };
        let collection = collection.to_string();
        self.db.call(move |db| db.get(&collection, row_id)).await
    }

    async fn insert(&self, collection: &str, data: DocData) -> Result<Document, StoreError> {
        let collection = collection.to_string();
        self.db.call(move |db| db.insert(&collection, data)).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &DocId,
        data: DocData,
    ) -> Result<Document, StoreError> {
        let collection = collection.to_string();
        let id = id.clone();
        self.db
            .call(move |db| db.update(&collection, &id, data))
            .await
    }

    async fn ensure_index(&self, field: &str) -> Result<(), StoreError> {
        let field = field.to_string();
        self.db.call(move |db| db.ensure_index(&field)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::store::Sort;
    use serde_json::json;

    fn data(value: Value) -> DocData {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_create_database_and_run_migrations() -> Result<(), StoreError> {
        let db = SqliteDb::new_in_memory()?;
        let table_count: i32 = db.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = 'documents'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(table_count, 1);
        Ok(())
    }

    #[test]
    fn test_insert_and_get() -> Result<(), StoreError> {
        let db = SqliteDb::new_in_memory()?;
        let doc = db.insert("posts", data(json!({"title": "First", "id": 99})))?;
        assert_eq!(doc.id, DocId::Int(1));
        assert_eq!(doc.get("title"), Some(&json!("First")));
        assert_eq!(doc.get("id"), None, "system fields are not stored in data");

        let fetched = db.get("posts", 1)?.expect("document should exist");
        assert_eq!(fetched, doc);
        assert!(db.get("pages", 1)?.is_none(), "lookups are scoped to a collection");
        Ok(())
    }

    #[test]
    fn test_count_is_per_collection() -> Result<(), StoreError> {
        let db = SqliteDb::new_in_memory()?;
        db.insert("posts", DocData::new())?;
        db.insert("posts", DocData::new())?;
        db.insert("pages", DocData::new())?;
        assert_eq!(db.count("posts")?, 2);
        assert_eq!(db.count("pages")?, 1);
        assert_eq!(db.count("missing")?, 0);
        Ok(())
    }

    #[test]
    fn test_update_merges_fields() -> Result<(), StoreError> {
        let db = SqliteDb::new_in_memory()?;
        let doc = db.insert("posts", data(json!({"title": "Keep", "docOrder": 0})))?;
        let updated = db.update("posts", &doc.id, data(json!({"docOrder": 4})))?;
        assert_eq!(updated.get_i64("docOrder"), Some(4));
        assert_eq!(updated.get("title"), Some(&json!("Keep")));

        let fetched = db.get("posts", 1)?.expect("document should exist");
        assert_eq!(fetched.get_i64("docOrder"), Some(4));
        assert_eq!(fetched.created_at, doc.created_at);
        Ok(())
    }

    #[test]
    fn test_update_missing_document_is_not_found() -> Result<(), StoreError> {
        let db = SqliteDb::new_in_memory()?;
        let err = db
            .update("posts", &DocId::Int(404), DocData::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        let err = db
            .update("posts", &DocId::Text("not-a-row".into()), DocData::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        Ok(())
    }

    #[test]
    fn test_find_sorts_by_data_field_with_insertion_tiebreak() -> Result<(), StoreError> {
        let db = SqliteDb::new_in_memory()?;
        db.insert("posts", data(json!({"title": "a", "docOrder": 2})))?;
        db.insert("posts", data(json!({"title": "b", "docOrder": 1})))?;
        db.insert("posts", data(json!({"title": "c", "docOrder": 1})))?;
        db.insert("posts", data(json!({"title": "d", "docOrder": 0})))?;

        let asc = db.find(&FindQuery::new("posts").sort(Sort::asc("docOrder")))?;
        let titles: Vec<_> = asc.docs.iter().map(|d| d.get("title").cloned()).collect();
        assert_eq!(
            titles,
            vec![
                Some(json!("d")),
                Some(json!("b")),
                Some(json!("c")),
                Some(json!("a"))
            ]
        );

        let desc = db.find(&FindQuery::new("posts").sort(Sort::desc("docOrder")))?;
        let titles: Vec<_> = desc.docs.iter().map(|d| d.get("title").cloned()).collect();
        assert_eq!(
            titles,
            vec![
                Some(json!("a")),
                Some(json!("b")),
                Some(json!("c")),
                Some(json!("d"))
            ]
        );
        Ok(())
    }

    #[test]
    fn test_find_newest_first() -> Result<(), StoreError> {
        let db = SqliteDb::new_in_memory()?;
        for i in 0..3 {
            db.insert("posts", data(json!({ "n": i })))?;
        }
        let result = db.find(&FindQuery::new("posts").sort(Sort::desc("createdAt")).all())?;
        let ns: Vec<_> = result.docs.iter().map(|d| d.get_i64("n")).collect();
        assert_eq!(ns, vec![Some(2), Some(1), Some(0)]);
        Ok(())
    }

    #[test]
    fn test_find_paginates() -> Result<(), StoreError> {
        let db = SqliteDb::new_in_memory()?;
        for i in 0..30 {
            db.insert("posts", data(json!({ "docOrder": i })))?;
        }
        let first = db.find(&FindQuery::new("posts").sort(Sort::asc("docOrder")).limit(25))?;
        assert_eq!(first.docs.len(), 25);
        assert_eq!(first.total_docs, 30);
        assert!(first.has_next_page);

        let second = db.find(
            &FindQuery::new("posts")
                .sort(Sort::asc("docOrder"))
                .limit(25)
                .page(2),
        )?;
        assert_eq!(second.docs.len(), 5);
        assert_eq!(second.docs[0].get_i64("docOrder"), Some(25));
        assert!(!second.has_next_page);

        let all = db.find(&FindQuery::new("posts").all())?;
        assert_eq!(all.docs.len(), 30);
        Ok(())
    }

    #[test]
    fn test_ensure_index_is_idempotent_and_validates() -> Result<(), StoreError> {
        let db = SqliteDb::new_in_memory()?;
        db.ensure_index("docOrder")?;
        db.ensure_index("docOrder")?;
        let index_count: i32 = db.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name = 'idx_documents_field_docOrder'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(index_count, 1);
        assert!(matches!(
            db.ensure_index("bad name"),
            Err(StoreError::InvalidField(_))
        ));
        Ok(())
    }

    #[test]
    fn test_find_rejects_offset_overflow() -> Result<(), StoreError> {
        let db = SqliteDb::new_in_memory()?;
        db.insert("posts", data(json!({"title": "x"})))?;
        let query = FindQuery::new("posts").limit(u32::MAX).page(u32::MAX);
        assert!(matches!(
            db.find(&query),
            Err(StoreError::PageOutOfRange { limit: u32::MAX, page: u32::MAX })
        ));

        // The largest offset that still fits is a valid, empty page.
        let far = db.find(&FindQuery::new("posts").limit(u32::MAX).page(2))?;
        assert!(far.docs.is_empty());
        assert_eq!(far.total_docs, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_handle_survives_a_panicking_call() {
        let handle = DbHandle::new(SqliteDb::new_in_memory().unwrap());
        let panicked = handle
            .call(|_db| -> Result<(), StoreError> { panic!("boom") })
            .await;
        assert!(matches!(panicked, Err(StoreError::Task(_))));

        let count = handle.call(|db| db.count("posts")).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_huge_page_leaves_store_usable() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .insert("posts", data(json!({"title": "x"})))
            .await
            .unwrap();
        let query = FindQuery::new("posts").limit(u32::MAX).page(u32::MAX);
        assert!(matches!(
            store.find(&query).await,
            Err(StoreError::PageOutOfRange { .. })
        ));
        assert_eq!(store.count("posts").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_store_trait_round_trip_through_handle() {
        let store = SqliteStore::in_memory().unwrap();
        let doc = store
            .insert("posts", data(json!({"title": "x"})))
            .await
            .unwrap();
        assert_eq!(store.count("posts").await.unwrap(), 1);
        let found = store.find_by_id("posts", &doc.id).await.unwrap();
        assert_eq!(found, Some(doc.clone()));
        let by_text = store
            .find_by_id("posts", &DocId::Text("1".into()))
            .await
            .unwrap();
        assert_eq!(by_text, Some(doc));
        assert_eq!(
            store
                .find_by_id("posts", &DocId::Text("abc".into()))
                .await
                .unwrap(),
            None
        );
    }
}
