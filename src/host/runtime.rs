use std::sync::Arc;

use tracing::{debug, info};

use super::config::{CollectionConfig, FieldAccess, HookArgs, HostConfig, Operation};
use super::request::RequestContext;
use super::store::{DocData, DocId, Document, DocumentStore, FindQuery, PaginatedDocs};
use crate::errors::HostError;

/// Whether a write or read goes through field-level access rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Normal request path: denied fields are silently dropped.
    Enforce,
    /// Privileged internal access.
    Override,
}

/// A running CMS host: a composed configuration bound to a document store.
///
/// Writes run the collection's before-validate hooks in registration order
/// after field access has been applied, so hooks may set fields that direct
/// writers cannot.
pub struct Host {
    config: HostConfig,
    store: Arc<dyn DocumentStore>,
}

impl Host {
    pub fn new(config: HostConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    fn collection(&self, slug: &str) -> Result<&CollectionConfig, HostError> {
        self.config
            .collection(slug)
            .ok_or_else(|| HostError::UnknownCollection(slug.to_string()))
    }

    /// Create indexes for indexed fields, then run the configured `onInit`.
    pub async fn init(&self) -> Result<(), HostError> {
        for collection in &self.config.collections {
            for field in collection.fields.iter().filter(|f| f.index) {
                self.store.ensure_index(&field.name).await?;
            }
        }
        if let Some(on_init) = &self.config.on_init {
            on_init.on_init(self).await.map_err(HostError::Init)?;
        }
        info!(
            collections = self.config.collections.len(),
            endpoints = self.config.endpoints.len(),
            "host initialised"
        );
        Ok(())
    }

    pub async fn count(&self, collection: &str) -> Result<u64, HostError> {
        self.collection(collection)?;
        Ok(self.store.count(collection).await?)
    }

    pub async fn find(
        &self,
        query: &FindQuery,
        mode: AccessMode,
    ) -> Result<PaginatedDocs, HostError> {
        let config = self.collection(&query.collection)?;
        let mut result = self.store.find(query).await?;
        if mode == AccessMode::Enforce {
            for doc in &mut result.docs {
                strip_denied(config, &mut doc.fields, |a| a.read.is_denied());
            }
        }
        Ok(result)
    }

    pub async fn find_by_id(
        &self,
        collection: &str,
        id: &DocId,
    ) -> Result<Option<Document>, HostError> {
        self.collection(collection)?;
        Ok(self.store.find_by_id(collection, id).await?)
    }

    pub async fn create(
        &self,
        collection: &str,
        mut data: DocData,
        ctx: &RequestContext,
        mode: AccessMode,
    ) -> Result<Document, HostError> {
        let config = self.collection(collection)?;
        if mode == AccessMode::Enforce {
            strip_denied(config, &mut data, |a| a.create.is_denied());
        }
        let data = self
            .run_before_validate(config, Operation::Create, ctx, data)
            .await?;
        let doc = self.store.insert(collection, data).await?;
        debug!(collection, id = %doc.id, "document created");
        Ok(doc)
    }

    pub async fn update(
        &self,
        collection: &str,
        id: &DocId,
        mut data: DocData,
        ctx: &RequestContext,
        mode: AccessMode,
    ) -> Result<Document, HostError> {
        let config = self.collection(collection)?;
        if mode == AccessMode::Enforce {
            strip_denied(config, &mut data, |a| a.update.is_denied());
        }
        let data = self
            .run_before_validate(config, Operation::Update, ctx, data)
            .await?;
        Ok(self.store.update(collection, id, data).await?)
    }

    async fn run_before_validate(
        &self,
        config: &CollectionConfig,
        operation: Operation,
        ctx: &RequestContext,
        mut data: DocData,
    ) -> Result<DocData, HostError> {
        let args = HookArgs {
            host: self,
            collection: &config.slug,
            operation,
            ctx,
        };
        for hook in &config.hooks.before_validate {
            data = hook
                .before_validate(&args, data)
                .await
                .map_err(|source| HostError::Hook {
                    hook: hook.name().to_string(),
                    collection: config.slug.clone(),
                    source,
                })?;
        }
        Ok(data)
    }
}

fn strip_denied(
    config: &CollectionConfig,
    data: &mut DocData,
    denied: impl Fn(&FieldAccess) -> bool,
) {
    for field in &config.fields {
        if denied(&field.access) {
            data.remove(&field.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::config::{
        AccessRule, BeforeValidateHook, CollectionConfig, FieldConfig, FieldType, OnInit,
    };
    use crate::host::sqlite::SqliteStore;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    fn data(value: Value) -> DocData {
        value.as_object().cloned().unwrap()
    }

    fn locked_field(name: &str) -> FieldConfig {
        let mut field = FieldConfig::new(name, FieldType::Number);
        field.access.create = AccessRule::Denied;
        field.access.update = AccessRule::Denied;
        field.index = true;
        field
    }

    struct Stamp;

    #[async_trait]
    impl BeforeValidateHook for Stamp {
        fn name(&self) -> &str {
            "stamp"
        }

        async fn before_validate(
            &self,
            args: &HookArgs<'_>,
            mut data: DocData,
        ) -> anyhow::Result<DocData> {
            let label = match args.operation {
                Operation::Create => "created",
                Operation::Update => "updated",
            };
            data.insert("locked".into(), json!(label));
            Ok(data)
        }
    }

    struct Reject;

    #[async_trait]
    impl BeforeValidateHook for Reject {
        fn name(&self) -> &str {
            "reject"
        }

        async fn before_validate(&self, _: &HookArgs<'_>, _: DocData) -> anyhow::Result<DocData> {
            anyhow::bail!("rejected")
        }
    }

    fn host(collection: CollectionConfig) -> Host {
        let config = HostConfig::default().with_collection(collection);
        Host::new(config, Arc::new(SqliteStore::in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_create_drops_denied_fields_for_direct_writers() {
        let host = host(CollectionConfig::new("posts").with_field(locked_field("locked")));
        let ctx = RequestContext::authenticated("editor");
        let doc = host
            .create("posts", data(json!({"title": "t", "locked": 9})), &ctx, AccessMode::Enforce)
            .await
            .unwrap();
        assert_eq!(doc.get("locked"), None);
        assert_eq!(doc.get("title"), Some(&json!("t")));

        let privileged = host
            .create("posts", data(json!({"locked": 9})), &ctx, AccessMode::Override)
            .await
            .unwrap();
        assert_eq!(privileged.get_i64("locked"), Some(9));
    }

    #[tokio::test]
    async fn test_hooks_may_set_fields_denied_to_writers() {
        let mut collection = CollectionConfig::new("posts").with_field(locked_field("locked"));
        collection.hooks.before_validate.push(Arc::new(Stamp));
        let host = host(collection);
        let ctx = RequestContext::anonymous();

        let doc = host
            .create("posts", DocData::new(), &ctx, AccessMode::Enforce)
            .await
            .unwrap();
        assert_eq!(doc.get("locked"), Some(&json!("created")));

        let updated = host
            .update("posts", &doc.id, DocData::new(), &ctx, AccessMode::Enforce)
            .await
            .unwrap();
        assert_eq!(updated.get("locked"), Some(&json!("updated")));
    }

    #[tokio::test]
    async fn test_update_enforce_ignores_denied_fields() {
        let host = host(CollectionConfig::new("posts").with_field(locked_field("locked")));
        let ctx = RequestContext::authenticated("editor");
        let doc = host
            .create("posts", data(json!({"locked": 1})), &ctx, AccessMode::Override)
            .await
            .unwrap();

        let updated = host
            .update("posts", &doc.id, data(json!({"locked": 5})), &ctx, AccessMode::Enforce)
            .await
            .unwrap();
        assert_eq!(updated.get_i64("locked"), Some(1));

        let overridden = host
            .update("posts", &doc.id, data(json!({"locked": 5})), &ctx, AccessMode::Override)
            .await
            .unwrap();
        assert_eq!(overridden.get_i64("locked"), Some(5));
    }

    #[tokio::test]
    async fn test_hook_failure_aborts_create() {
        let mut collection = CollectionConfig::new("posts");
        collection.hooks.before_validate.push(Arc::new(Reject));
        let host = host(collection);
        let err = host
            .create("posts", DocData::new(), &RequestContext::anonymous(), AccessMode::Enforce)
            .await
            .unwrap_err();
        match err {
            HostError::Hook { hook, collection, .. } => {
                assert_eq!(hook, "reject");
                assert_eq!(collection, "posts");
            }
            other => panic!("Expected Hook error, got {:?}", other),
        }
        assert_eq!(host.count("posts").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_rejected() {
        let host = host(CollectionConfig::new("posts"));
        assert!(matches!(
            host.count("pages").await,
            Err(HostError::UnknownCollection(_))
        ));
        assert!(matches!(
            host.find(&FindQuery::new("pages"), AccessMode::Enforce).await,
            Err(HostError::UnknownCollection(_))
        ));
    }

    #[tokio::test]
    async fn test_find_enforce_strips_read_denied_fields() {
        let mut secret = FieldConfig::new("secret", FieldType::Text);
        secret.access.read = AccessRule::Denied;
        let host = host(CollectionConfig::new("posts").with_field(secret));
        host.create(
            "posts",
            data(json!({"secret": "s", "title": "t"})),
            &RequestContext::anonymous(),
            AccessMode::Enforce,
        )
        .await
        .unwrap();

        let public = host
            .find(&FindQuery::new("posts"), AccessMode::Enforce)
            .await
            .unwrap();
        assert_eq!(public.docs[0].get("secret"), None);
        assert_eq!(public.docs[0].get("title"), Some(&json!("t")));

        let internal = host
            .find(&FindQuery::new("posts"), AccessMode::Override)
            .await
            .unwrap();
        assert_eq!(internal.docs[0].get("secret"), Some(&json!("s")));
    }

    struct RecordInit(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl OnInit for RecordInit {
        async fn on_init(&self, host: &Host) -> anyhow::Result<()> {
            self.0
                .lock()
                .unwrap()
                .push(format!("{} collections", host.config().collections.len()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_init_runs_on_init() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut config = HostConfig::default()
            .with_collection(CollectionConfig::new("posts").with_field(locked_field("locked")));
        config.on_init = Some(Arc::new(RecordInit(calls.clone())));
        let host = Host::new(config, Arc::new(SqliteStore::in_memory().unwrap()));
        host.init().await.unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["1 collections".to_string()]);
    }
}
