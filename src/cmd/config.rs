//! Settings view and validation commands: `docs-reorder config`.

use std::path::Path;

use anyhow::Result;

use docs_reorder::settings::Settings;

use super::super::ConfigCommands;

pub fn cmd_config(
    config_path: &Path,
    settings: &Settings,
    command: Option<ConfigCommands>,
) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            if config_path.exists() {
                println!("# Settings from {}", config_path.display());
            } else {
                println!(
                    "# No settings file at {}; showing defaults",
                    config_path.display()
                );
            }
            println!();
            print!("{}", settings.to_toml()?);
        }
        Some(ConfigCommands::Validate) => {
            if !config_path.exists() {
                println!("No settings file found. Using defaults.");
            }
            let warnings = settings.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("Settings file already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }
            if let Some(parent) = config_path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }

            Settings::default().save(config_path)?;

            println!("Created {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [plugin] collections, access, initialize_doc_order");
            println!("  - [[collections]] slug, use_as_title");
            println!("  - [auth.api_keys] for editors allowed to write");
        }
    }

    Ok(())
}
