use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::settings::LoggingSection;

/// Log filename inside the configured log directory.
pub const LOG_FILENAME: &str = "docs-reorder.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Filter used when `RUST_LOG` is not set.
pub fn default_directive(level: &str) -> String {
    format!("docs_reorder={level},tower_http={level}")
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(level)))
}

fn file_appender(dir: &Path) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
    Ok(RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILENAME))
}

/// Install the global subscriber: stderr output (human or JSON) and, when
/// `dir` is set, a daily rotated log file in the same format.
///
/// `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingSection) -> Result<()> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.json {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_target(true)
                .with_filter(env_filter(&config.level))
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(env_filter(&config.level))
                .boxed(),
        );
    }

    if let Some(dir) = &config.dir {
        let appender = file_appender(dir)?;
        let layer: BoxedLayer = if config.json {
            fmt::layer()
                .json()
                .with_writer(appender)
                .with_target(true)
                .with_filter(env_filter(&config.level))
                .boxed()
        } else {
            fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(true)
                .with_filter(env_filter(&config.level))
                .boxed()
        };
        layers.push(layer);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("Failed to install the tracing subscriber")
}
