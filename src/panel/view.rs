use serde_json::Value;

use super::client::PanelClient;
use super::state::{PanelDoc, PanelState, ReorderPanel};
use crate::host::store::DocId;
use crate::plugin::translations;

/// One rendered row of the panel list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: DocId,
    pub order: Option<i64>,
    pub pending: Option<i64>,
    pub title: String,
    pub href: String,
}

impl RowView {
    /// `"{order} - {pending} - {title}"`, the pending part only when staged.
    pub fn label(&self) -> String {
        let order = self.order.map(|o| o.to_string()).unwrap_or_default();
        match self.pending {
            Some(pending) => format!("{} - {} - {}", order, pending, self.title),
            None => format!("{} - {}", order, self.title),
        }
    }
}

/// Which footer buttons are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub save: bool,
    pub cancel: bool,
    pub load_more: bool,
}

/// Edit-view link of a document.
pub fn document_href(collection: &str, id: &DocId) -> String {
    format!("/admin/collections/{}/{}", collection, id)
}

fn title_of(doc: &PanelDoc, title_field: &str) -> String {
    if title_field == "id" {
        return doc.doc.id.to_string();
    }
    match doc.doc.get(title_field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => doc.doc.id.to_string(),
        Some(other) => other.to_string(),
    }
}

impl<C: PanelClient> ReorderPanel<C> {
    pub fn rows(&self) -> Vec<RowView> {
        let title_field = &self.options().title_field;
        self.docs()
            .iter()
            .map(|d| RowView {
                id: d.doc.id.clone(),
                order: d.doc_order(),
                pending: d.pending(),
                title: title_of(d, title_field),
                href: document_href(self.collection(), &d.doc.id),
            })
            .collect()
    }

    /// `Loading` while a request is in flight, else `"{loaded} {n}/{total}"`.
    pub fn footer(&self) -> String {
        match self.state() {
            PanelState::Loading | PanelState::Saving => "Loading".to_string(),
            PanelState::Loaded | PanelState::Dirty => format!(
                "{} {}/{}",
                self.translator().t(&translations::key("loaded")),
                self.docs().len(),
                self.total_docs()
            ),
        }
    }

    pub fn controls(&self) -> Controls {
        let dirty = self.has_unsaved_changes();
        Controls {
            save: dirty,
            cancel: dirty,
            load_more: self.has_next_page(),
        }
    }
}
