//! The docs-reorder plugin.
//!
//! `docs_reorder(options)` returns a transform over `HostConfig`. For every
//! collection named in the options it injects the `docOrder` field and,
//! unless the plugin is disabled, the increment hook and the panel trigger.
//! Globally it mounts the bulk reorder endpoint, merges UI strings into the
//! host registry and chains the startup backfill after any existing
//! `onInit`.
//!
//! | Module          | Responsibility                                   |
//! |-----------------|--------------------------------------------------|
//! | `field`         | the `docOrder` field definition                  |
//! | `increment`     | before-validate hook assigning the next order    |
//! | `access`        | reorder authorization predicates                 |
//! | `save_changes`  | `POST /collection-docs-order/save` handler       |
//! | `backfill`      | startup order assignment for legacy documents    |
//! | `translations`  | bundled UI strings and the translator            |

pub mod access;
pub mod backfill;
pub mod field;
pub mod increment;
pub mod save_changes;
pub mod translations;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::host::config::{EndpointConfig, EndpointMethod, HostConfig};

pub use access::{AccessPredicate, access_fn, default_access};
pub use backfill::{BackfillOutcome, BackfillReport, ReorderInit, backfill_collection};
pub use field::{DOC_ORDER_FIELD, inject_order_field, order_field};
pub use increment::IncrementOrder;
pub use save_changes::{ReorderEntry, SaveChanges, SaveChangesArgs, SaveChangesResult};

/// Path of the bulk reorder endpoint, relative to the host API root.
pub const ENDPOINT_PATH: &str = "/collection-docs-order/save";

/// Reference of the panel trigger registered in each collection's
/// before-list slot.
pub const CLIENT_COMPONENT: &str = "docs-reorder/client#CollectionDocsOrderButton";

#[derive(Clone, Default)]
pub struct PluginOptions {
    /// Reorder authorization; authenticated callers when `None`.
    pub access: Option<Arc<dyn AccessPredicate>>,
    pub collections: BTreeSet<String>,
    /// Keep the `docOrder` field so stored data and its schema stay
    /// consistent, but register nothing else.
    pub disabled: bool,
    pub initialize_doc_order: bool,
}

impl PluginOptions {
    pub fn new<I, S>(collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            collections: collections.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn access(mut self, access: Arc<dyn AccessPredicate>) -> Self {
        self.access = Some(access);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn initialize_doc_order(mut self, initialize: bool) -> Self {
        self.initialize_doc_order = initialize;
        self
    }
}

impl fmt::Debug for PluginOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginOptions")
            .field("access", &self.access.as_ref().map(|_| "custom"))
            .field("collections", &self.collections)
            .field("disabled", &self.disabled)
            .field("initialize_doc_order", &self.initialize_doc_order)
            .finish()
    }
}

/// Plugin entry point in the host's `plugins: [docs_reorder(..)]` style.
pub fn docs_reorder(options: PluginOptions) -> impl FnOnce(HostConfig) -> HostConfig {
    move |config| apply(config, &options)
}

/// Compose the plugin into a host configuration.
pub fn apply(mut config: HostConfig, options: &PluginOptions) -> HostConfig {
    for slug in &options.collections {
        let Some(collection) = config.collection_mut(slug) else {
            warn!(collection = %slug, "ordering enabled for a collection the host does not define");
            continue;
        };
        inject_order_field(collection);
        if options.disabled {
            continue;
        }
        if !collection
            .hooks
            .before_validate
            .iter()
            .any(|h| h.name() == "incrementOrder")
        {
            collection
                .hooks
                .before_validate
                .push(Arc::new(IncrementOrder));
        }
        let before_list = &mut collection.admin.components.before_list;
        if !before_list.iter().any(|c| c == CLIENT_COMPONENT) {
            before_list.push(CLIENT_COMPONENT.to_string());
        }
    }

    if options.disabled {
        debug!("docs-reorder disabled; only the order field was added");
        return config;
    }

    let collections = Arc::new(options.collections.clone());
    let access = options.access.clone().unwrap_or_else(default_access);
    config.endpoints.push(EndpointConfig {
        method: EndpointMethod::Post,
        path: ENDPOINT_PATH.to_string(),
        handler: Arc::new(SaveChanges::new(access, collections.clone())),
    });

    let host_strings = std::mem::take(&mut config.i18n.translations);
    config.i18n.translations = translations::deep_merge(translations::bundled(), host_strings);

    let previous = config.on_init.take();
    config.on_init = Some(Arc::new(ReorderInit::new(
        previous,
        collections,
        options.initialize_doc_order,
    )));

    debug!(
        collections = options.collections.len(),
        initialize_doc_order = options.initialize_doc_order,
        "docs-reorder applied"
    );
    config
}
