//! Host configuration model.
//!
//! A `HostConfig` describes the collections a CMS host serves, their fields
//! and lifecycle hooks, the custom endpoints it mounts, its translation
//! registry and its startup callback. Plugins are functions from one
//! `HostConfig` to the next.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::request::RequestContext;
use super::runtime::Host;
use super::store::DocData;
use crate::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldType {
    #[default]
    Text,
    Number,
}

/// Whether direct writers (requests going through normal write paths) may
/// touch a field. Privileged internal writes bypass these rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessRule {
    #[default]
    Allowed,
    Denied,
}

impl AccessRule {
    pub fn is_denied(self) -> bool {
        self == AccessRule::Denied
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldAccess {
    pub create: AccessRule,
    pub read: AccessRule,
    pub update: AccessRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldAdmin {
    /// Hidden from manual edit forms.
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldConfig {
    pub name: String,
    pub field_type: FieldType,
    pub access: FieldAccess,
    pub admin: FieldAdmin,
    pub index: bool,
}

impl FieldConfig {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            access: FieldAccess::default(),
            admin: FieldAdmin::default(),
            index: false,
        }
    }
}

/// The write operation a hook is running for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
}

/// Context passed to collection hooks.
pub struct HookArgs<'a> {
    pub host: &'a Host,
    pub collection: &'a str,
    pub operation: Operation,
    pub ctx: &'a RequestContext,
}

/// Runs before a document is validated and persisted. Returns the
/// (possibly modified) document data.
#[async_trait]
pub trait BeforeValidateHook: Send + Sync {
    fn name(&self) -> &str;

    async fn before_validate(&self, args: &HookArgs<'_>, data: DocData)
    -> anyhow::Result<DocData>;
}

#[derive(Clone, Default)]
pub struct CollectionHooks {
    pub before_validate: Vec<Arc<dyn BeforeValidateHook>>,
}

impl fmt::Debug for CollectionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.before_validate.iter().map(|h| h.name()).collect();
        f.debug_struct("CollectionHooks")
            .field("before_validate", &names)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionComponents {
    /// Client component references rendered above the list view.
    pub before_list: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionAdmin {
    pub use_as_title: Option<String>,
    pub components: CollectionComponents,
}

#[derive(Debug, Clone)]
pub struct CollectionConfig {
    pub slug: String,
    pub fields: Vec<FieldConfig>,
    pub hooks: CollectionHooks,
    pub admin: CollectionAdmin,
}

impl CollectionConfig {
    pub fn new(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            fields: Vec::new(),
            hooks: CollectionHooks::default(),
            admin: CollectionAdmin::default(),
        }
    }

    pub fn with_field(mut self, field: FieldConfig) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_title(mut self, field: &str) -> Self {
        self.admin.use_as_title = Some(field.to_string());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field used as the display title; the id when none is configured.
    pub fn title_field(&self) -> &str {
        self.admin.use_as_title.as_deref().unwrap_or("id")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointMethod {
    Get,
    Post,
    Patch,
    Delete,
}

/// A custom endpoint mounted under the host's API root.
#[async_trait]
pub trait EndpointHandler: Send + Sync {
    async fn handle(
        &self,
        host: &Host,
        ctx: &RequestContext,
        body: &[u8],
    ) -> Result<Value, ApiError>;
}

#[derive(Clone)]
pub struct EndpointConfig {
    pub method: EndpointMethod,
    pub path: String,
    pub handler: Arc<dyn EndpointHandler>,
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct I18nConfig {
    /// `{ language: { namespace: { key: text } } }`
    pub translations: Value,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            translations: Value::Object(Default::default()),
        }
    }
}

/// Startup callback, run once after the host is built.
#[async_trait]
pub trait OnInit: Send + Sync {
    async fn on_init(&self, host: &Host) -> anyhow::Result<()>;
}

#[derive(Clone, Default)]
pub struct HostConfig {
    pub collections: Vec<CollectionConfig>,
    pub i18n: I18nConfig,
    pub endpoints: Vec<EndpointConfig>,
    pub on_init: Option<Arc<dyn OnInit>>,
}

impl HostConfig {
    pub fn with_collection(mut self, collection: CollectionConfig) -> Self {
        self.collections.push(collection);
        self
    }

    pub fn collection(&self, slug: &str) -> Option<&CollectionConfig> {
        self.collections.iter().find(|c| c.slug == slug)
    }

    pub fn collection_mut(&mut self, slug: &str) -> Option<&mut CollectionConfig> {
        self.collections.iter_mut().find(|c| c.slug == slug)
    }
}

impl fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostConfig")
            .field("collections", &self.collections)
            .field("i18n", &self.i18n)
            .field("endpoints", &self.endpoints)
            .field("on_init", &self.on_init.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_lookup() {
        let mut config = HostConfig::default()
            .with_collection(CollectionConfig::new("posts"))
            .with_collection(CollectionConfig::new("pages"));
        assert!(config.collection("posts").is_some());
        assert!(config.collection("media").is_none());

        config
            .collection_mut("pages")
            .unwrap()
            .fields
            .push(FieldConfig::new("title", FieldType::Text));
        assert!(config.collection("pages").unwrap().field("title").is_some());
    }

    #[test]
    fn test_title_field_defaults_to_id() {
        let plain = CollectionConfig::new("posts");
        assert_eq!(plain.title_field(), "id");
        let titled = CollectionConfig::new("posts").with_title("headline");
        assert_eq!(titled.title_field(), "headline");
    }

    #[test]
    fn test_field_defaults_allow_everything() {
        let field = FieldConfig::new("title", FieldType::Text);
        assert!(!field.access.create.is_denied());
        assert!(!field.access.read.is_denied());
        assert!(!field.access.update.is_denied());
        assert!(!field.admin.hidden);
        assert!(!field.index);
    }
}
