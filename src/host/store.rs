use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::StoreError;

/// Field data of a document, excluding the system-managed `id` and `createdAt`.
pub type DocData = Map<String, Value>;

/// Document identifier. Clients may send either JSON numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocId {
    Int(i64),
    Text(String),
}

impl DocId {
    /// Parse an identifier taken from a URL path segment.
    pub fn from_path(segment: &str) -> Self {
        match segment.parse::<i64>() {
            Ok(n) => DocId::Int(n),
            Err(_) => DocId::Text(segment.to_string()),
        }
    }

    /// Numeric row id, if the identifier is (or spells) an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DocId::Int(n) => Some(*n),
            DocId::Text(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocId::Int(n) => write!(f, "{}", n),
            DocId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for DocId {
    fn from(n: i64) -> Self {
        DocId::Int(n)
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        DocId::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: DocData,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Integer value of a field. `null` and missing fields both yield `None`.
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(Value::as_i64)
    }
}

/// Sort order in the `[-]field` notation of the collection read API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub descending: bool,
}

impl Sort {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }
}

impl FromStr for Sort {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (field, descending) = match s.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        if !is_plain_identifier(field) {
            return Err(StoreError::InvalidField(field.to_string()));
        }
        Ok(Self {
            field: field.to_string(),
            descending,
        })
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field)
        } else {
            write!(f, "{}", self.field)
        }
    }
}

/// Field names end up inside SQL expressions, so they are restricted.
pub fn is_plain_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A collection query. `limit == 0` returns every document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindQuery {
    pub collection: String,
    pub sort: Option<Sort>,
    pub limit: u32,
    pub page: u32,
    pub locale: Option<String>,
}

impl FindQuery {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            sort: None,
            limit: 10,
            page: 1,
            locale: None,
        }
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn locale(mut self, locale: Option<String>) -> Self {
        self.locale = locale;
        self
    }

    /// Disable pagination.
    pub fn all(self) -> Self {
        self.limit(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedDocs {
    pub docs: Vec<Document>,
    pub total_docs: u64,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    pub has_next_page: bool,
    #[serde(default)]
    pub has_prev_page: bool,
}

impl PaginatedDocs {
    pub fn new(docs: Vec<Document>, total_docs: u64, limit: u32, page: u32) -> Self {
        let page = page.max(1);
        let total_pages = if limit == 0 {
            1
        } else {
            (total_docs.div_ceil(u64::from(limit)) as u32).max(1)
        };
        Self {
            docs,
            total_docs,
            limit,
            page,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// The storage engine consumed by the host runtime.
///
/// Implementations apply writes as given; access control and hooks live in
/// `Host`. Real implementation: `SqliteStore`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn count(&self, collection: &str) -> Result<u64, StoreError>;

    async fn find(&self, query: &FindQuery) -> Result<PaginatedDocs, StoreError>;

    async fn find_by_id(&self, collection: &str, id: &DocId)
    -> Result<Option<Document>, StoreError>;

    async fn insert(&self, collection: &str, data: DocData) -> Result<Document, StoreError>;

    /// Shallow-merge `data` into an existing document.
    async fn update(
        &self,
        collection: &str,
        id: &DocId,
        data: DocData,
    ) -> Result<Document, StoreError>;

    async fn ensure_index(&self, field: &str) -> Result<(), StoreError>;
}
