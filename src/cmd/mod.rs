//! CLI command implementations.
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `serve`  | `Serve`          |
//! | `panel`  | `Panel`          |
//! | `config` | `Config`         |

pub mod config;
pub mod panel;
pub mod serve;

pub use config::cmd_config;
pub use panel::{PanelArgs, cmd_panel};
pub use serve::cmd_serve;
