//! In-memory `PanelClient` for view-model tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::client::{PageRequest, PanelClient};
use crate::errors::PanelError;
use crate::host::store::{DocData, DocId, Document, PaginatedDocs};
use crate::plugin::field::DOC_ORDER_FIELD;
use crate::plugin::save_changes::{SaveChangesArgs, SaveChangesResult};
use crate::plugin::translations;

#[derive(Default)]
struct Inner {
    docs: Vec<Document>,
    requests: Vec<PageRequest>,
    saved: Vec<SaveChangesArgs>,
    reject_saves: bool,
    break_saves: bool,
    break_fetches: bool,
    translations: Option<Value>,
    break_translations: bool,
}

/// Serves documents with ids `1..=n` and `docOrder = id - 1`. Saved
/// batches are applied so reloads see them.
#[derive(Clone, Default)]
pub(crate) struct MockClient {
    inner: Arc<Mutex<Inner>>,
}

impl MockClient {
    pub(crate) fn with_orders(n: i64) -> Self {
        let docs = (0..n)
            .map(|order| {
                let mut fields = DocData::new();
                fields.insert(DOC_ORDER_FIELD.into(), Value::from(order));
                fields.insert("title".into(), Value::from(format!("Post {}", order + 1)));
                Document {
                    id: DocId::Int(order + 1),
                    created_at: Utc::now(),
                    fields,
                }
            })
            .collect();
        let client = Self::default();
        client.inner.lock().unwrap().docs = docs;
        client
    }

    pub(crate) fn last_request(&self) -> Option<PageRequest> {
        self.inner.lock().unwrap().requests.last().cloned()
    }

    pub(crate) fn saved_batches(&self) -> Vec<SaveChangesArgs> {
        self.inner.lock().unwrap().saved.clone()
    }

    /// Answer saves with `{ success: false }`.
    pub(crate) fn reject_saves(&self) {
        self.inner.lock().unwrap().reject_saves = true;
    }

    pub(crate) fn break_saves(&self) {
        self.inner.lock().unwrap().break_saves = true;
    }

    pub(crate) fn break_fetches(&self) {
        self.inner.lock().unwrap().break_fetches = true;
    }

    /// Serve this registry instead of the bundled strings.
    pub(crate) fn set_translations(&self, translations: Value) {
        self.inner.lock().unwrap().translations = Some(translations);
    }

    pub(crate) fn break_translations(&self) {
        self.inner.lock().unwrap().break_translations = true;
    }

    pub(crate) fn clear_order_of(&self, id: i64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(doc) = inner.docs.iter_mut().find(|d| d.id == DocId::Int(id)) {
            doc.fields.insert(DOC_ORDER_FIELD.into(), Value::Null);
        }
    }
}

#[async_trait]
impl PanelClient for MockClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PaginatedDocs, PanelError> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(request.clone());
        if inner.break_fetches {
            return Err(PanelError::Status {
                url: format!("mock://{}", request.collection),
                status: 500,
            });
        }

        let mut docs = inner.docs.clone();
        docs.sort_by_key(|d| (d.get_i64(DOC_ORDER_FIELD), d.id.as_i64()));
        if request.sort.descending {
            docs.sort_by(|a, b| {
                b.get_i64(DOC_ORDER_FIELD)
                    .cmp(&a.get_i64(DOC_ORDER_FIELD))
                    .then(a.id.as_i64().cmp(&b.id.as_i64()))
            });
        }
        let total = docs.len() as u64;
        let start = ((request.page - 1) * request.limit) as usize;
        let page: Vec<Document> = docs
            .into_iter()
            .skip(start)
            .take(request.limit as usize)
            .collect();
        Ok(PaginatedDocs::new(page, total, request.limit, request.page))
    }

    async fn save_changes(
        &self,
        args: &SaveChangesArgs,
    ) -> Result<SaveChangesResult, PanelError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.break_saves {
            return Err(PanelError::Other(anyhow::anyhow!("connection reset")));
        }
        inner.saved.push(args.clone());
        if inner.reject_saves {
            return Ok(SaveChangesResult { success: false });
        }
        for entry in &args.docs {
            if let Some(doc) = inner.docs.iter_mut().find(|d| d.id == entry.id) {
                doc.fields
                    .insert(DOC_ORDER_FIELD.into(), Value::from(entry.modified_to));
            }
        }
        Ok(SaveChangesResult { success: true })
    }

    async fn fetch_translations(&self) -> Result<Value, PanelError> {
        let inner = self.inner.lock().unwrap();
        if inner.break_translations {
            return Err(PanelError::Status {
                url: "mock://i18n".to_string(),
                status: 404,
            });
        }
        Ok(inner.translations.clone().unwrap_or_else(translations::bundled))
    }
}
