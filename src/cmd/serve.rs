//! HTTP host command: `docs-reorder serve`.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, warn};

use docs_reorder::plugin::docs_reorder;
use docs_reorder::server::start_server;
use docs_reorder::settings::Settings;

pub async fn cmd_serve(
    settings: Settings,
    port: Option<u16>,
    db_path: Option<PathBuf>,
    dev: bool,
) -> Result<()> {
    for warning in settings.validate() {
        warn!("{}", warning);
    }

    let mut server = settings.server_config();
    if let Some(port) = port {
        server.port = port;
    }
    if let Some(db_path) = db_path {
        server.db_path = db_path;
    }
    server.dev_mode |= dev;

    let options = settings.plugin_options();
    info!(
        collections = ?options.collections,
        disabled = options.disabled,
        initialize_doc_order = options.initialize_doc_order,
        "composing host"
    );
    let host_config = docs_reorder(options)(settings.host_config());

    start_server(server, host_config).await
}
