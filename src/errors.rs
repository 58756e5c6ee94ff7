//! Typed error hierarchy for docs-reorder.
//!
//! Four enums cover the layers of the crate:
//! - `StoreError`: document storage failures
//! - `HostError`: host runtime failures (unknown collections, hooks, init)
//! - `ReorderError`: rejections from the bulk reorder endpoint
//! - `PanelError`: reorder panel client failures
//!
//! `ApiError` is the HTTP-facing error every endpoint maps into.

use thiserror::Error;

use crate::host::store::DocId;

/// Errors from the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document {id} not found in collection '{collection}'")]
    NotFound { collection: String, id: DocId },

    #[error("Invalid field name '{0}': only ASCII letters, digits and '_' are allowed")]
    InvalidField(String),

    #[error("Stored document {id} is corrupt: {message}")]
    Corrupt { id: i64, message: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Page {page} of {limit} documents is out of range")]
    PageOutOfRange { limit: u32, page: u32 },

    #[error("Database task failed: {0}")]
    Task(String),
}

/// Errors from the host runtime.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Collection '{0}' is not configured")]
    UnknownCollection(String),

    #[error("Hook '{hook}' failed on collection '{collection}': {source}")]
    Hook {
        hook: String,
        collection: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("onInit failed: {0}")]
    Init(#[source] anyhow::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Rejections from the bulk reorder endpoint. None of these are raised
/// after a write has been attempted.
#[derive(Debug, Error)]
pub enum ReorderError {
    #[error("Invalid reorder request: {0}")]
    Validation(String),

    #[error("Collection '{0}' does not have document ordering enabled")]
    CollectionNotEnabled(String),

    #[error("Not allowed to reorder documents")]
    Forbidden,
}

/// Errors surfaced by the reorder panel and its clients.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Row index {index} is out of range ({len} rows loaded)")]
    RowOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// HTTP-facing error. Converted into a JSON `{"error": ...}` response by the
/// server module.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl From<ReorderError> for ApiError {
    fn from(err: ReorderError) -> Self {
        match err {
            ReorderError::Validation(_) | ReorderError::CollectionNotEnabled(_) => {
                ApiError::BadRequest(err.to_string())
            }
            ReorderError::Forbidden => ApiError::Forbidden(err.to_string()),
        }
    }
}

impl From<HostError> for ApiError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::UnknownCollection(_) | HostError::Store(StoreError::NotFound { .. }) => {
                ApiError::NotFound(err.to_string())
            }
            HostError::Store(StoreError::InvalidField(_) | StoreError::PageOutOfRange { .. }) => {
                ApiError::BadRequest(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}
