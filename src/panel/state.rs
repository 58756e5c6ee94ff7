use std::time::Duration;

use tracing::{debug, info, warn};

use super::client::{PageRequest, PanelClient};
use super::{PAGE_SIZE, SAVE_SETTLE_DELAY};
use crate::errors::PanelError;
use crate::host::store::{Document, Sort};
use crate::plugin::field::DOC_ORDER_FIELD;
use crate::plugin::save_changes::{ReorderEntry, SaveChangesArgs};
use crate::plugin::translations::{self, FALLBACK_LANGUAGE, Translator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn sort(self) -> Sort {
        match self {
            SortOrder::Asc => Sort::asc(DOC_ORDER_FIELD),
            SortOrder::Desc => Sort::desc(DOC_ORDER_FIELD),
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// ```text
/// Loading ──> Loaded ──move──> Dirty ──save──> Saving ──ok──> Loading ──> Loaded
///    ^                           │                  └─fail─> Dirty
///    └──────── cancel / sort ────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Loading,
    Loaded,
    Dirty,
    Saving,
}

/// A loaded document plus its staged order, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelDoc {
    pub doc: Document,
    pub modified_to: Option<i64>,
}

impl PanelDoc {
    fn new(doc: Document) -> Self {
        Self {
            doc,
            modified_to: None,
        }
    }

    pub fn doc_order(&self) -> Option<i64> {
        self.doc.get_i64(DOC_ORDER_FIELD)
    }

    /// The staged order when it differs from the stored one.
    pub fn pending(&self) -> Option<i64> {
        self.modified_to.filter(|to| Some(*to) != self.doc_order())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { submitted: usize },
    Failed,
    NothingToSave,
}

#[derive(Debug, Clone)]
pub struct PanelOptions {
    pub locale: Option<String>,
    pub page_size: u32,
    /// Wait between a successful save and the reload.
    pub save_delay: Duration,
    pub sort_order: SortOrder,
    pub title_field: String,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            locale: None,
            page_size: PAGE_SIZE,
            save_delay: SAVE_SETTLE_DELAY,
            sort_order: SortOrder::Asc,
            title_field: "id".to_string(),
        }
    }
}

/// View-model of one open reorder panel.
///
/// Holds the loaded pages and the staged `modifiedTo` values. Nothing is
/// written to the server until `save`; `cancel` and sort changes throw the
/// staged values away.
pub struct ReorderPanel<C> {
    client: C,
    collection: String,
    options: PanelOptions,
    translator: Translator,
    docs: Vec<PanelDoc>,
    has_next_page: bool,
    total_docs: u64,
    loaded_pages: u32,
    loading: bool,
    saving: bool,
    notifications: Vec<Notification>,
}

impl<C: PanelClient> ReorderPanel<C> {
    /// A panel in the `Loading` state; call `reload` to fetch the first page.
    pub fn new(client: C, collection: &str, options: PanelOptions) -> Self {
        let language = options.locale.as_deref().unwrap_or(FALLBACK_LANGUAGE);
        let translator = Translator::bundled(language);
        Self {
            client,
            collection: collection.to_string(),
            options,
            translator,
            docs: Vec::new(),
            has_next_page: false,
            total_docs: 0,
            loaded_pages: 0,
            loading: true,
            saving: false,
            notifications: Vec::new(),
        }
    }

    /// Create the panel, resolve its strings through the host registry and
    /// load the first page.
    pub async fn open(
        client: C,
        collection: &str,
        options: PanelOptions,
    ) -> Result<Self, PanelError> {
        let mut panel = Self::new(client, collection, options);
        panel.load_translations().await;
        panel.reload().await?;
        Ok(panel)
    }

    /// Switch to the host's translation registry. The bundled strings stay
    /// in use when the registry cannot be fetched.
    pub async fn load_translations(&mut self) {
        match self.client.fetch_translations().await {
            Ok(registry) => {
                self.translator = Translator::new(registry, self.translator.language());
            }
            Err(e) => {
                warn!(error = %e, "host translations unavailable; using bundled strings");
            }
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn options(&self) -> &PanelOptions {
        &self.options
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn docs(&self) -> &[PanelDoc] {
        &self.docs
    }

    pub fn total_docs(&self) -> u64 {
        self.total_docs
    }

    pub fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    pub fn sort_order(&self) -> SortOrder {
        self.options.sort_order
    }

    pub fn state(&self) -> PanelState {
        if self.saving {
            PanelState::Saving
        } else if self.loading {
            PanelState::Loading
        } else if self.has_unsaved_changes() {
            PanelState::Dirty
        } else {
            PanelState::Loaded
        }
    }

    fn page_request(&self, page: u32) -> PageRequest {
        PageRequest {
            collection: self.collection.clone(),
            sort: self.options.sort_order.sort(),
            limit: self.options.page_size,
            page,
            locale: self.options.locale.clone(),
        }
    }

    /// Load page 1 from scratch, dropping staged changes and extra pages.
    pub async fn reload(&mut self) -> Result<(), PanelError> {
        self.loading = true;
        let result = self.client.fetch_page(&self.page_request(1)).await;
        self.loading = false;
        let page = result?;
        self.docs = page.docs.into_iter().map(PanelDoc::new).collect();
        self.has_next_page = page.has_next_page;
        self.total_docs = page.total_docs;
        self.loaded_pages = 1;
        debug!(
            collection = %self.collection,
            loaded = self.docs.len(),
            total = self.total_docs,
            "panel reloaded"
        );
        Ok(())
    }

    /// Append the next page. Staged changes on loaded rows are kept.
    /// Returns the number of rows added.
    pub async fn load_more(&mut self) -> Result<usize, PanelError> {
        if !self.has_next_page {
            return Ok(0);
        }
        self.loading = true;
        let result = self
            .client
            .fetch_page(&self.page_request(self.loaded_pages + 1))
            .await;
        self.loading = false;
        let page = result?;
        let added = page.docs.len();
        self.docs.extend(page.docs.into_iter().map(PanelDoc::new));
        self.has_next_page = page.has_next_page;
        self.loaded_pages += 1;
        Ok(added)
    }

    /// Switch the sort direction. Staged changes are discarded and page 1
    /// is reloaded; selecting the current direction does nothing.
    pub async fn set_sort_order(&mut self, order: SortOrder) -> Result<(), PanelError> {
        if order == self.options.sort_order {
            return Ok(());
        }
        self.options.sort_order = order;
        self.reload().await
    }

    pub async fn toggle_sort_order(&mut self) -> Result<(), PanelError> {
        self.set_sort_order(self.options.sort_order.toggled()).await
    }

    /// Move the row at `from` to position `to`.
    ///
    /// Every row whose slot changed takes over the order of the row that
    /// previously sat there: its staged value if it had one, its stored
    /// `docOrder` otherwise.
    pub fn move_row(&mut self, from: usize, to: usize) -> Result<(), PanelError> {
        let len = self.docs.len();
        for index in [from, to] {
            if index >= len {
                return Err(PanelError::RowOutOfRange { index, len });
            }
        }
        let previous: Vec<_> = self
            .docs
            .iter()
            .map(|d| (d.doc.id.clone(), d.modified_to.or_else(|| d.doc_order())))
            .collect();

        let moved = self.docs.remove(from);
        self.docs.insert(to, moved);

        for (doc, (prev_id, prev_order)) in self.docs.iter_mut().zip(previous) {
            if doc.doc.id != prev_id {
                doc.modified_to = prev_order;
            }
        }
        Ok(())
    }

    /// Rows whose staged order differs from the stored one.
    pub fn staged_changes(&self) -> Vec<ReorderEntry> {
        self.docs
            .iter()
            .filter_map(|d| {
                d.pending().map(|modified_to| ReorderEntry {
                    id: d.doc.id.clone(),
                    modified_to,
                })
            })
            .collect()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.docs.iter().any(|d| d.pending().is_some())
    }

    /// Submit the staged changes.
    ///
    /// On success waits `save_delay`, reloads and queues a success
    /// notification. On failure queues an error notification and keeps the
    /// staged changes. Only a failing reload after a successful save is
    /// returned as an error.
    pub async fn save(&mut self) -> Result<SaveOutcome, PanelError> {
        let docs = self.staged_changes();
        if docs.is_empty() {
            return Ok(SaveOutcome::NothingToSave);
        }
        let submitted = docs.len();
        let args = SaveChangesArgs {
            collection: self.collection.clone(),
            docs,
        };

        self.saving = true;
        let result = self.client.save_changes(&args).await;
        self.saving = false;

        let success = match result {
            Ok(result) => result.success,
            Err(e) => {
                warn!(collection = %self.collection, error = %e, "saving new order failed");
                false
            }
        };
        if !success {
            self.notify_error();
            return Ok(SaveOutcome::Failed);
        }

        self.loading = true;
        if !self.options.save_delay.is_zero() {
            tokio::time::sleep(self.options.save_delay).await;
        }
        self.reload().await?;
        info!(collection = %self.collection, submitted, "new order saved");
        self.notifications.push(Notification::Success(
            self.translator.t(&translations::key("success")),
        ));
        Ok(SaveOutcome::Saved { submitted })
    }

    fn notify_error(&mut self) {
        self.notifications
            .push(Notification::Error(self.translator.t(&translations::key("error"))));
    }

    /// Discard staged changes and reload page 1.
    pub async fn cancel(&mut self) -> Result<(), PanelError> {
        self.reload().await
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}
