use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docs_reorder::logging::init_logging;
use docs_reorder::settings::{DEFAULT_CONFIG_FILE, Settings};

mod cmd;

#[derive(Parser)]
#[command(name = "docs-reorder")]
#[command(version, about = "Manual document ordering for CMS collections")]
pub struct Cli {
    /// Path to the settings file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the CMS host with document ordering enabled
    Serve {
        /// Port to serve on (overrides [server].port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Database path (overrides [server].db_path)
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Enable dev mode (bind 0.0.0.0, permissive CORS)
        #[arg(long)]
        dev: bool,
    },
    /// Reorder the documents of a collection interactively
    Panel {
        /// Collection slug
        collection: String,

        /// Server root URL
        #[arg(long, env = "DOCS_REORDER_URL", default_value = "http://localhost:3000")]
        url: String,

        /// API key sent as a bearer token
        #[arg(long, env = "DOCS_REORDER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Locale passed to the read API and used for UI strings
        #[arg(long)]
        locale: Option<String>,

        /// Field shown as the row title (defaults to the collection's use_as_title)
        #[arg(long)]
        title_field: Option<String>,
    },
    /// View, validate or initialise the settings file
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Print the effective settings as TOML
    Show,
    /// Validate the settings and show any warnings
    Validate,
    /// Write a default settings file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let settings = Settings::load_or_default(&cli.config)?;

    match &cli.command {
        Commands::Serve { port, db_path, dev } => {
            init_logging(&settings.logging)?;
            cmd::cmd_serve(settings, *port, db_path.clone(), *dev).await?;
        }
        Commands::Panel {
            collection,
            url,
            api_key,
            locale,
            title_field,
        } => {
            init_logging(&settings.logging)?;
            cmd::cmd_panel(
                &settings,
                cmd::PanelArgs {
                    collection: collection.clone(),
                    url: url.clone(),
                    api_key: api_key.clone(),
                    locale: locale.clone(),
                    title_field: title_field.clone(),
                },
            )
            .await?;
        }
        Commands::Config { command } => cmd::cmd_config(&cli.config, &settings, command.clone())?,
    }

    Ok(())
}
