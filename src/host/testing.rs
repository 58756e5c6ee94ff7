//! Test doubles for the document store.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::sqlite::SqliteStore;
use super::store::{DocData, DocId, Document, DocumentStore, FindQuery, PaginatedDocs};
use crate::errors::StoreError;

/// SQLite-backed store with injectable failures.
pub(crate) struct FlakyStore {
    inner: SqliteStore,
    fail_count: AtomicBool,
    fail_updates: Mutex<HashSet<DocId>>,
}

impl FlakyStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: SqliteStore::in_memory().unwrap(),
            fail_count: AtomicBool::new(false),
            fail_updates: Mutex::new(HashSet::new()),
        }
    }

    pub(crate) fn fail_count(&self) {
        self.fail_count.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_update_of(&self, id: DocId) {
        self.fail_updates.lock().unwrap().insert(id);
    }
}

fn injected() -> StoreError {
    StoreError::Task("injected failure".to_string())
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.count(collection).await
    }

    async fn find(&self, query: &FindQuery) -> Result<PaginatedDocs, StoreError> {
        self.inner.find(query).await
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &DocId,
    ) -> Result<Option<Document>, StoreError> {
        self.inner.find_by_id(collection, id).await
    }

    async fn insert(&self, collection: &str, data: DocData) -> Result<Document, StoreError> {
        self.inner.insert(collection, data).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &DocId,
        data: DocData,
    ) -> Result<Document, StoreError> {
        if self.fail_updates.lock().unwrap().contains(id) {
            return Err(injected());
        }
        self.inner.update(collection, id, data).await
    }

    async fn ensure_index(&self, field: &str) -> Result<(), StoreError> {
        self.inner.ensure_index(field).await
    }
}
