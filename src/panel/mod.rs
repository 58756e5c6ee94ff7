//! Reorder panel: the view-model behind the list editors use to drag
//! documents into a new order.
//!
//! `ReorderPanel` owns the loaded pages and the staged changes and talks to
//! the server through a `PanelClient`. `HttpPanelClient` is the real client;
//! the `panel` CLI command drives the view-model from a terminal.

pub mod client;
pub mod state;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

pub use client::{HttpPanelClient, PageRequest, PanelClient};
pub use state::{
    Notification, PanelDoc, PanelOptions, PanelState, ReorderPanel, SaveOutcome, SortOrder,
};
pub use view::{Controls, RowView, document_href};

/// Documents fetched per page.
pub const PAGE_SIZE: u32 = 25;

/// Pause between a successful save and the reload that shows it.
pub const SAVE_SETTLE_DELAY: Duration = Duration::from_millis(500);
