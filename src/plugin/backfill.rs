use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info, warn};

use super::field::DOC_ORDER_FIELD;
use crate::errors::HostError;
use crate::host::config::OnInit;
use crate::host::request::RequestContext;
use crate::host::runtime::{AccessMode, Host};
use crate::host::store::{DocData, FindQuery, Sort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillOutcome {
    /// Orders were assigned.
    Initialized,
    /// At least one document already carried `docOrder`; nothing was written.
    AlreadyInitialized,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillReport {
    pub collection: String,
    pub outcome: BackfillOutcome,
    pub assigned: usize,
    pub failed: usize,
}

/// Give every document of a collection an initial `docOrder`.
///
/// Documents are ranked newest first (`-createdAt`) and numbered from 0.
/// The collection is left untouched when any document already has an order.
/// Per-document write failures are logged and counted; the remaining
/// documents are still processed.
pub async fn backfill_collection(host: &Host, slug: &str) -> Result<BackfillReport, HostError> {
    let query = FindQuery::new(slug).sort(Sort::desc("createdAt")).all();
    let docs = host.find(&query, AccessMode::Override).await?.docs;

    let mut report = BackfillReport {
        collection: slug.to_string(),
        outcome: BackfillOutcome::Empty,
        assigned: 0,
        failed: 0,
    };
    if docs.is_empty() {
        return Ok(report);
    }
    if docs.iter().any(|d| d.get_i64(DOC_ORDER_FIELD).is_some()) {
        report.outcome = BackfillOutcome::AlreadyInitialized;
        return Ok(report);
    }

    report.outcome = BackfillOutcome::Initialized;
    let ctx = RequestContext::anonymous();
    for (index, doc) in docs.iter().enumerate() {
        let mut data = DocData::new();
        data.insert(DOC_ORDER_FIELD.to_string(), Value::from(index));
        match host
            .update(slug, &doc.id, data, &ctx, AccessMode::Override)
            .await
        {
            Ok(_) => report.assigned += 1,
            Err(e) => {
                report.failed += 1;
                warn!(collection = slug, id = %doc.id, error = %e, "failed to backfill docOrder");
            }
        }
    }
    Ok(report)
}

/// Startup callback installed by the plugin. Runs the previously configured
/// callback first, then backfills each ordered collection when enabled.
pub struct ReorderInit {
    previous: Option<Arc<dyn OnInit>>,
    collections: Arc<BTreeSet<String>>,
    initialize_doc_order: bool,
}

impl ReorderInit {
    pub fn new(
        previous: Option<Arc<dyn OnInit>>,
        collections: Arc<BTreeSet<String>>,
        initialize_doc_order: bool,
    ) -> Self {
        Self {
            previous,
            collections,
            initialize_doc_order,
        }
    }
}

#[async_trait]
impl OnInit for ReorderInit {
    async fn on_init(&self, host: &Host) -> anyhow::Result<()> {
        if let Some(previous) = &self.previous {
            previous.on_init(host).await?;
        }
        if !self.initialize_doc_order {
            return Ok(());
        }
        for slug in self.collections.iter() {
            match backfill_collection(host, slug).await {
                Ok(report) => info!(
                    collection = %report.collection,
                    outcome = ?report.outcome,
                    assigned = report.assigned,
                    failed = report.failed,
                    "docOrder backfill finished"
                ),
                Err(e) => error!(collection = %slug, error = %e, "docOrder backfill failed"),
            }
        }
        Ok(())
    }
}
