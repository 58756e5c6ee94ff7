//! Settings file for the docs-reorder server and CLI.
//!
//! Read from `docs-reorder.toml` in the working directory unless `--config`
//! points elsewhere. Every section is optional.
//!
//! ```toml
//! [server]
//! port = 3000
//! db_path = ".docs-reorder/cms.db"
//! dev_mode = false
//!
//! [plugin]
//! collections = ["posts"]
//! disabled = false
//! initialize_doc_order = true
//! access = "authenticated"   # or "public"
//! allowed_users = []         # when non-empty only these users may reorder
//!
//! [[collections]]
//! slug = "posts"
//! use_as_title = "title"
//!
//! [auth.api_keys]
//! "secret-key" = "editor"
//!
//! [logging]
//! level = "info"
//! json = false
//! dir = ".docs-reorder/logs"
//!
//! # Host strings; these win over the bundled ones.
//! [translations.en.pluginCollectionsDocsOrder]
//! save = "Apply"
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::host::config::{CollectionConfig, HostConfig};
use crate::host::store::is_plain_identifier;
use crate::plugin::PluginOptions;
use crate::plugin::access::{AllowUsers, Authenticated, Public};
use crate::server::{I18N_SEGMENT, ServerConfig};

pub const DEFAULT_CONFIG_FILE: &str = "docs-reorder.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Bind on all interfaces and allow any CORS origin.
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".docs-reorder/cms.db")
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            db_path: default_db_path(),
            dev_mode: false,
        }
    }
}

/// Who may submit reorder batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPolicy {
    #[default]
    Authenticated,
    Public,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginSection {
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
    /// Backfill `docOrder` for existing documents at startup.
    #[serde(default)]
    pub initialize_doc_order: bool,
    #[serde(default)]
    pub access: AccessPolicy,
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSection {
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_as_title: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSection {
    /// API key -> user id.
    #[serde(default)]
    pub api_keys: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// Also write daily-rotated log files here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub plugin: PluginSection,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<CollectionSection>,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub logging: LoggingSection,
    /// Host translation registry: `language -> namespace -> key -> text`.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub translations: Map<String, Value>,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse settings from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse docs-reorder.toml")
    }

    /// Defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize settings")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Collections served by the host: every `[[collections]]` entry plus a
    /// bare collection for each plugin collection not declared there.
    pub fn host_config(&self) -> HostConfig {
        let mut config = HostConfig::default();
        for section in &self.collections {
            let mut collection = CollectionConfig::new(&section.slug);
            collection.admin.use_as_title = section.use_as_title.clone();
            config = config.with_collection(collection);
        }
        for slug in &self.plugin.collections {
            if config.collection(slug).is_none() {
                config = config.with_collection(CollectionConfig::new(slug));
            }
        }
        config.i18n.translations = Value::Object(self.translations.clone());
        config
    }

    pub fn plugin_options(&self) -> PluginOptions {
        let options = PluginOptions::new(self.plugin.collections.iter().cloned())
            .disabled(self.plugin.disabled)
            .initialize_doc_order(self.plugin.initialize_doc_order);
        if !self.plugin.allowed_users.is_empty() {
            let users: BTreeSet<String> = self.plugin.allowed_users.iter().cloned().collect();
            return options.access(Arc::new(AllowUsers(users)));
        }
        match self.plugin.access {
            AccessPolicy::Authenticated => options.access(Arc::new(Authenticated)),
            AccessPolicy::Public => options.access(Arc::new(Public)),
        }
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            port: self.server.port,
            db_path: self.server.db_path.clone(),
            dev_mode: self.server.dev_mode,
            api_keys: self
                .auth
                .api_keys
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<HashMap<_, _>>(),
        }
    }

    /// Validate the settings and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let mut seen = BTreeSet::new();
        for section in &self.collections {
            if section.slug.is_empty() || section.slug.contains('/') {
                warnings.push(format!(
                    "Collection slug '{}' must be non-empty and must not contain '/'",
                    section.slug
                ));
            }
            if section.slug == I18N_SEGMENT {
                warnings.push(format!(
                    "Collection slug '{}' is shadowed by the translations route",
                    section.slug
                ));
            }
            if !seen.insert(section.slug.as_str()) {
                warnings.push(format!("Collection '{}' is declared twice", section.slug));
            }
            if let Some(title) = &section.use_as_title
                && !is_plain_identifier(title)
            {
                warnings.push(format!(
                    "use_as_title '{}' on collection '{}' is not a plain field name",
                    title, section.slug
                ));
            }
        }

        for slug in &self.plugin.collections {
            if !seen.contains(slug.as_str()) {
                warnings.push(format!(
                    "Plugin collection '{}' has no [[collections]] entry; it will be served without a title field",
                    slug
                ));
            }
        }

        if self.plugin.access == AccessPolicy::Public && !self.plugin.allowed_users.is_empty() {
            warnings.push("allowed_users overrides access = \"public\"".to_string());
        }

        if self.auth.api_keys.is_empty() {
            warnings.push(
                "No API keys configured; every request is anonymous and cannot create documents"
                    .to_string(),
            );
        }

        warnings
    }
}
