use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::errors::PanelError;
use crate::host::store::{PaginatedDocs, Sort};
use crate::plugin::ENDPOINT_PATH;
use crate::server::I18N_SEGMENT;
use crate::plugin::save_changes::{SaveChangesArgs, SaveChangesResult};

/// One page of the collection read API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub collection: String,
    pub sort: Sort,
    pub limit: u32,
    pub page: u32,
    pub locale: Option<String>,
}

/// What the panel needs from the server.
#[async_trait]
pub trait PanelClient: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PaginatedDocs, PanelError>;

    async fn save_changes(&self, args: &SaveChangesArgs)
    -> Result<SaveChangesResult, PanelError>;

    /// The host's merged translation registry.
    async fn fetch_translations(&self) -> Result<Value, PanelError>;
}

/// `PanelClient` over the host's HTTP API.
pub struct HttpPanelClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpPanelClient {
    /// `server_url` is the host root, e.g. `http://localhost:3000`; requests
    /// go to `{server_url}/api`.
    pub fn new(server_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: format!("{}/api", server_url.trim_end_matches('/')),
            api_key,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {}", key)),
            None => builder,
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, PanelError> {
        let resp = self
            .authorize(builder)
            .send()
            .await
            .map_err(|source| PanelError::Http {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PanelError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.json::<T>().await.map_err(|source| PanelError::Http {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl PanelClient for HttpPanelClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PaginatedDocs, PanelError> {
        let url = format!("{}/{}", self.api_url, request.collection);
        let mut query = vec![
            ("sort", request.sort.to_string()),
            ("limit", request.limit.to_string()),
            ("page", request.page.to_string()),
            ("depth", "0".to_string()),
        ];
        if let Some(locale) = &request.locale {
            query.push(("locale", locale.clone()));
        }
        debug!(url = %url, page = request.page, sort = %request.sort, "fetching page");
        self.send(&url, self.client.get(&url).query(&query)).await
    }

    async fn save_changes(
        &self,
        args: &SaveChangesArgs,
    ) -> Result<SaveChangesResult, PanelError> {
        let url = format!("{}{}", self.api_url, ENDPOINT_PATH);
        debug!(url = %url, entries = args.docs.len(), "submitting reorder batch");
        self.send(&url, self.client.post(&url).json(args)).await
    }

    async fn fetch_translations(&self) -> Result<Value, PanelError> {
        let url = format!("{}/{}", self.api_url, I18N_SEGMENT);
        debug!(url = %url, "fetching translations");
        self.send(&url, self.client.get(&url)).await
    }
}
