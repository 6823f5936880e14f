//! Maestro Server
//!
//! HTTP API server for the multi-agent conversational orchestrator.
//! This is a library crate — the server is started via `start_server()`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{http::Method, routing::get, Json, Router};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use maestro_core::providers::{OpenAiChatProvider, SearchProvider, TavilySearchProvider};
use maestro_core::{
    AgentRegistry, AgentRunner, KnowledgeBase, Orchestrator, RuntimeConfig, SessionStore,
    ToolRuntime,
};

pub mod error;
pub mod routes;
pub mod types;

/// Configuration error at startup; maps to exit code 1.
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for starting the server, read from the environment.
pub struct ServerConfig {
    /// Port to listen on (default: 3000).
    pub port: u16,
    /// LLM provider API key (required).
    pub llm_api_key: String,
    /// Optional LLM base URL override (OpenAI-compatible endpoints).
    pub llm_base_url: Option<String>,
    /// Web-search API key; absent disables the `web_search` tool.
    pub search_api_key: Option<String>,
    /// Path to the agent catalog document.
    pub catalog_path: PathBuf,
    /// Path to the knowledge catalog document.
    pub knowledge_path: PathBuf,
    /// Session store directory.
    pub sessions_path: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let llm_api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| ConfigError("LLM_API_KEY is required".to_string()))?;
        let catalog_path = PathBuf::from(
            std::env::var("CATALOG_PATH").unwrap_or_else(|_| "catalog/agents.json".to_string()),
        );
        let knowledge_path = std::env::var("KNOWLEDGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                catalog_path
                    .parent()
                    .unwrap_or_else(|| std::path::Path::new("."))
                    .join("knowledge.json")
            });
        let sessions_path = PathBuf::from(
            std::env::var("SESSIONS_PATH").unwrap_or_else(|_| "sessions".to_string()),
        );
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError("PORT must be a number".to_string()))?;

        Ok(Self {
            port,
            llm_api_key,
            llm_base_url: std::env::var("LLM_BASE_URL").ok(),
            search_api_key: std::env::var("WEB_SEARCH_API_KEY").ok(),
            catalog_path,
            knowledge_path,
            sessions_path,
        })
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub registry: Arc<AgentRegistry>,
    pub knowledge: Arc<KnowledgeBase>,
    pub orchestrator: Arc<Orchestrator>,
    /// Per-session locks: at most one active turn per session.
    pub turn_locks: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
}

/// Build the Axum router with all routes.
pub fn build_router(config: &ServerConfig) -> anyhow::Result<(Router, AppState)> {
    let registry = Arc::new(AgentRegistry::load(&config.catalog_path)?);
    let knowledge = Arc::new(KnowledgeBase::load(&config.knowledge_path)?);
    let store = Arc::new(SessionStore::open(&config.sessions_path)?);

    let runtime_config = RuntimeConfig::default();

    let llm = match &config.llm_base_url {
        Some(base) => OpenAiChatProvider::with_base_url(&config.llm_api_key, base),
        None => OpenAiChatProvider::new(&config.llm_api_key),
    };

    let search: Option<Arc<dyn SearchProvider>> = match &config.search_api_key {
        Some(key) => Some(Arc::new(TavilySearchProvider::new(key))),
        None => {
            tracing::warn!("WEB_SEARCH_API_KEY not set; web_search tool disabled");
            None
        }
    };

    let tools = Arc::new(ToolRuntime::new(
        search,
        knowledge.clone(),
        runtime_config.tool_timeout,
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        registry.clone(),
        knowledge.clone(),
        tools,
        AgentRunner::new(Arc::new(llm)),
        store.clone(),
        runtime_config,
    ));

    let state = AppState {
        store,
        registry,
        knowledge,
        orchestrator,
        turn_locks: Arc::new(RwLock::new(HashMap::new())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .merge(routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    Ok((app, state))
}

/// Start the server and block until shutdown.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let (app, _state) = build_router(&config)?;

    tracing::info!("maestro server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// How long a finished session keeps its turn lock entry before pruning.
pub const TURN_LOCK_MAX_ENTRIES: usize = 1000;

/// Fetch (or create) the per-session turn lock.
pub async fn session_turn_lock(state: &AppState, session_id: &str) -> Arc<Mutex<()>> {
    let mut locks = state.turn_locks.write().await;
    if locks.len() > TURN_LOCK_MAX_ENTRIES {
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
    locks
        .entry(session_id.to_string())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}
