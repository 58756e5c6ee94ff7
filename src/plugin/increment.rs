use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::field::DOC_ORDER_FIELD;
use crate::host::config::{BeforeValidateHook, HookArgs, Operation};
use crate::host::store::DocData;

/// Assigns `docOrder = number of documents already in the collection` to
/// newly created documents, so new documents sort last.
///
/// Two concurrent creations can read the same count and end up with the
/// same order value; duplicates are tolerated and fall back to insertion
/// order when sorting.
pub struct IncrementOrder;

#[async_trait]
impl BeforeValidateHook for IncrementOrder {
    fn name(&self) -> &str {
        "incrementOrder"
    }

    async fn before_validate(
        &self,
        args: &HookArgs<'_>,
        mut data: DocData,
    ) -> anyhow::Result<DocData> {
        if args.operation != Operation::Create {
            return Ok(data);
        }
        let total = args
            .host
            .count(args.collection)
            .await
            .with_context(|| format!("Failed to count documents in '{}'", args.collection))?;
        debug!(collection = args.collection, doc_order = total, "assigning docOrder");
        data.insert(DOC_ORDER_FIELD.to_string(), Value::from(total));
        Ok(data)
    }
}
