use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::access::AccessPredicate;
use super::field::DOC_ORDER_FIELD;
use crate::errors::{ApiError, ReorderError};
use crate::host::config::EndpointHandler;
use crate::host::request::RequestContext;
use crate::host::runtime::{AccessMode, Host};
use crate::host::store::{DocData, DocId};

/// One staged change: move document `id` to order `modified_to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReorderEntry {
    pub id: DocId,
    pub modified_to: i64,
}

/// Body of `POST /collection-docs-order/save`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SaveChangesArgs {
    pub collection: String,
    pub docs: Vec<ReorderEntry>,
}

impl SaveChangesArgs {
    /// Parse and validate a raw request body.
    pub fn parse(body: &[u8]) -> Result<Self, ReorderError> {
        let args: SaveChangesArgs =
            serde_json::from_slice(body).map_err(|e| ReorderError::Validation(e.to_string()))?;
        if args.collection.is_empty() {
            return Err(ReorderError::Validation(
                "collection must be a non-empty string".to_string(),
            ));
        }
        Ok(args)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveChangesResult {
    pub success: bool,
}

/// The bulk reorder handler.
///
/// Every entry is written as an independent privileged update, in order.
/// There is no transaction: a failing entry leaves the entries before and
/// after it applied, and the batch reports `success: false`.
pub struct SaveChanges {
    access: Arc<dyn AccessPredicate>,
    collections: Arc<BTreeSet<String>>,
}

impl SaveChanges {
    pub fn new(access: Arc<dyn AccessPredicate>, collections: Arc<BTreeSet<String>>) -> Self {
        Self {
            access,
            collections,
        }
    }

    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        args: &SaveChangesArgs,
    ) -> Result<(), ReorderError> {
        match self.access.allow(ctx, args).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ReorderError::Forbidden),
            Err(e) => {
                warn!(error = %e, "reorder access predicate failed");
                Err(ReorderError::Forbidden)
            }
        }
    }

    /// Apply every entry of an already validated and authorized batch.
    pub async fn apply(
        &self,
        host: &Host,
        ctx: &RequestContext,
        args: &SaveChangesArgs,
    ) -> SaveChangesResult {
        let mut failed = 0usize;
        for entry in &args.docs {
            let mut data = DocData::new();
            data.insert(DOC_ORDER_FIELD.to_string(), Value::from(entry.modified_to));
            if let Err(e) = host
                .update(&args.collection, &entry.id, data, ctx, AccessMode::Override)
                .await
            {
                failed += 1;
                warn!(
                    collection = %args.collection,
                    id = %entry.id,
                    modified_to = entry.modified_to,
                    error = %e,
                    "failed to update docOrder"
                );
            }
        }
        info!(
            collection = %args.collection,
            requested = args.docs.len(),
            failed,
            "reorder batch applied"
        );
        SaveChangesResult { success: failed == 0 }
    }
}

#[async_trait]
impl EndpointHandler for SaveChanges {
    async fn handle(
        &self,
        host: &Host,
        ctx: &RequestContext,
        body: &[u8],
    ) -> Result<Value, ApiError> {
        let args = SaveChangesArgs::parse(body)?;
        self.authorize(ctx, &args).await?;
        if !self.collections.contains(&args.collection) {
            return Err(ReorderError::CollectionNotEnabled(args.collection).into());
        }
        let result = self.apply(host, ctx, &args).await;
        serde_json::to_value(result).map_err(|e| ApiError::Internal(e.to_string()))
    }
}
