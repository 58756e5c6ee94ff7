//! Manual document ordering for CMS collections.
//!
//! The `plugin` module composes a `docOrder` field, an increment hook, a bulk
//! reorder endpoint and a startup backfill into a `host::HostConfig`. The
//! `panel` module is the view-model editors use to drag documents into a new
//! order; `server` exposes the composed host over HTTP.

pub mod errors;
pub mod host;
pub mod logging;
pub mod panel;
pub mod plugin;
pub mod server;
pub mod settings;
