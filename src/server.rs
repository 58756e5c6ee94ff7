use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{MethodRouter, delete, get, patch, post},
};
use serde::Deserialize;
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::errors::ApiError;
use crate::host::config::{EndpointHandler, EndpointMethod, HostConfig};
use crate::host::request::RequestContext;
use crate::host::runtime::{AccessMode, Host};
use crate::host::sqlite::SqliteStore;
use crate::host::store::{DocData, DocId, Document, FindQuery, PaginatedDocs, Sort};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub host: Arc<Host>,
    /// API key -> user id.
    pub api_keys: HashMap<String, String>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Resolve the caller from `Authorization: Bearer <key>`. Missing or
    /// unknown keys yield an anonymous context.
    fn request_context(&self, headers: &HeaderMap, locale: Option<String>) -> RequestContext {
        let user = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|key| self.api_keys.get(key.trim()));
        let ctx = match user {
            Some(id) => RequestContext::authenticated(id),
            None => RequestContext::anonymous(),
        };
        ctx.with_locale(locale)
    }
}

/// Configuration for the HTTP server.
pub struct ServerConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub dev_mode: bool,
    pub api_keys: HashMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            db_path: PathBuf::from(".docs-reorder/cms.db"),
            dev_mode: false,
            api_keys: HashMap::new(),
        }
    }
}

// ── Request payload types ─────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub sort: Option<String>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
    /// Accepted for compatibility; relations are never populated.
    pub depth: Option<u32>,
    pub locale: Option<String>,
    pub pagination: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LocaleParams {
    pub locale: Option<String>,
}

// ── Error handling ────────────────────────────────────────────────────

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

fn parse_data(body: &[u8]) -> Result<DocData, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Body must be a JSON object: {}", e)))
}

fn require_user(ctx: &RequestContext) -> Result<(), ApiError> {
    if ctx.is_authenticated() {
        Ok(())
    } else {
        Err(ApiError::Unauthorized(
            "A valid API key is required for this operation".into(),
        ))
    }
}

// ── Router ────────────────────────────────────────────────────────────

/// Path segment of the translation registry route, `/api/i18n`.
pub const I18N_SEGMENT: &str = "i18n";

/// Collection REST routes, health, and every endpoint registered in the
/// host configuration under `/api`.
pub fn api_router(config: &HostConfig) -> Router<SharedState> {
    let mut router = Router::new()
        .route("/health", get(health_check))
        .route(&format!("/api/{}", I18N_SEGMENT), get(get_translations))
        .route("/api/{collection}", get(list_docs).post(create_doc))
        .route("/api/{collection}/{id}", get(get_doc).patch(update_doc));

    for endpoint in &config.endpoints {
        let path = format!("/api{}", endpoint.path);
        info!(method = ?endpoint.method, path = %path, "mounting endpoint");
        router = router.route(&path, endpoint_route(endpoint.method, endpoint.handler.clone()));
    }
    router
}

fn endpoint_route(
    method: EndpointMethod,
    handler: Arc<dyn EndpointHandler>,
) -> MethodRouter<SharedState> {
    let run = move |State(state): State<SharedState>,
                    Query(params): Query<LocaleParams>,
                    headers: HeaderMap,
                    body: Bytes| {
        let handler = handler.clone();
        async move {
            let ctx = state.request_context(&headers, params.locale);
            handler
                .handle(&state.host, &ctx, &body)
                .await
                .map(Json)
        }
    };
    match method {
        EndpointMethod::Get => get(run),
        EndpointMethod::Post => post(run),
        EndpointMethod::Patch => patch(run),
        EndpointMethod::Delete => delete(run),
    }
}

/// Build the full application router.
pub fn build_router(state: SharedState) -> Router {
    api_router(state.host.config())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

/// The merged translation registry: bundled plugin strings overlaid with
/// the host's own.
async fn get_translations(State(state): State<SharedState>) -> Json<Value> {
    Json(state.host.config().i18n.translations.clone())
}

async fn list_docs(
    State(state): State<SharedState>,
    Path(collection): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedDocs>, ApiError> {
    let sort = params
        .sort
        .as_deref()
        .map(str::parse::<Sort>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let mut query = FindQuery::new(&collection)
        .limit(params.limit.unwrap_or(10))
        .page(params.page.unwrap_or(1))
        .locale(params.locale);
    if let Some(sort) = sort {
        query = query.sort(sort);
    }
    if params.pagination == Some(false) {
        query = query.all();
    }
    let docs = state.host.find(&query, AccessMode::Enforce).await?;
    Ok(Json(docs))
}

async fn get_doc(
    State(state): State<SharedState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Document>, ApiError> {
    let id = DocId::from_path(&id);
    state
        .host
        .find_by_id(&collection, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Document {} not found in '{}'", id, collection)))
}

async fn create_doc(
    State(state): State<SharedState>,
    Path(collection): Path<String>,
    Query(params): Query<LocaleParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let ctx = state.request_context(&headers, params.locale);
    require_user(&ctx)?;
    let data = parse_data(&body)?;
    let doc = state
        .host
        .create(&collection, data, &ctx, AccessMode::Enforce)
        .await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn update_doc(
    State(state): State<SharedState>,
    Path((collection, id)): Path<(String, String)>,
    Query(params): Query<LocaleParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Document>, ApiError> {
    let ctx = state.request_context(&headers, params.locale);
    require_user(&ctx)?;
    let data = parse_data(&body)?;
    let doc = state
        .host
        .update(&collection, &DocId::from_path(&id), data, &ctx, AccessMode::Enforce)
        .await?;
    Ok(Json(doc))
}

// ── Startup ───────────────────────────────────────────────────────────

/// Open the store, initialise the host (including `onInit`) and serve until
/// Ctrl-C.
pub async fn start_server(config: ServerConfig, host_config: HostConfig) -> Result<()> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let store = SqliteStore::open(&config.db_path).with_context(|| {
        format!("Failed to open document database at {}", config.db_path.display())
    })?;
    let host = Host::new(host_config, Arc::new(store));
    host.init().await.context("Host initialisation failed")?;

    let state = Arc::new(AppState {
        host: Arc::new(host),
        api_keys: config.api_keys,
    });

    let mut app = build_router(state);
    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let bind_host = if config.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", bind_host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "docs-reorder server listening");
    println!("docs-reorder running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}

// ── Tests ─────────────────────────────────────────────────────────────
