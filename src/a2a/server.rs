//! A2A HTTP server powered by axum.
//!
//! Serves:
//! - `GET  /.well-known/agent.json`: Agent Card discovery
//! - `POST /a2a`: JSON-RPC 2.0 endpoint
//! - `GET  /agents`: registered agents (registry only)
//! - `GET  /a2a/health`: health check

use crate::a2a::agent_card::{self, AgentCard};
use crate::a2a::client::A2aClient;
use crate::a2a::executor::TaskExecutor;
use crate::a2a::handler::Dispatcher;
use crate::a2a::registration;
use crate::a2a::registry::RegistryStore;
use crate::a2a::types::JsonRpcResponse;
use crate::config::{AgentServerConfig, RegistrySettings, Settings};
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state for the A2A server.
#[derive(Clone)]
pub struct A2aState {
    pub dispatcher: Arc<Dispatcher>,
    pub card: Arc<AgentCard>,
}

impl A2aState {
    pub fn new(dispatcher: Dispatcher, card: AgentCard) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            card: Arc::new(card),
        }
    }
}

/// Build the axum router. `/agents` is only mounted for a registry.
pub fn build_router(state: A2aState) -> Router {
    let mut router = Router::new()
        .route("/.well-known/agent.json", get(get_agent_card))
        .route("/a2a", post(handle_jsonrpc))
        .route("/a2a/health", get(health_check));

    if state.dispatcher.registry_store().is_some() {
        router = router.route("/agents", get(list_agents));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Router for a registry backed by `store`, advertising `registry_url`.
pub fn registry_router(store: RegistryStore, registry_url: &str) -> Router {
    let card = agent_card::registry_agent_card(registry_url);
    build_router(A2aState::new(Dispatcher::registry(store), card))
}

/// Router for a worker agent.
pub fn agent_router(card: AgentCard, executor: Arc<dyn TaskExecutor>) -> Router {
    build_router(A2aState::new(Dispatcher::worker(executor), card))
}

/// Start the registry server and run until the listener fails.
pub async fn serve_registry(settings: &RegistrySettings) -> anyhow::Result<()> {
    let listener = TcpListener::bind(settings.bind_addr())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind registry on {}: {}", settings.bind_addr(), e))?;
    serve_registry_on(listener, settings).await
}

/// [`serve_registry`] on an already bound listener.
pub async fn serve_registry_on(
    listener: TcpListener,
    settings: &RegistrySettings,
) -> anyhow::Result<()> {
    let store = RegistryStore::new(settings.agent_ttl());
    let public_url = settings.public_url();
    let app = registry_router(store, &public_url);

    tracing::info!("A2A Registry starting on http://{}", listener.local_addr()?);
    tracing::info!("   Agent Card: {}/.well-known/agent.json", public_url);
    tracing::info!("   JSON-RPC:   {}/a2a", public_url);
    tracing::info!("   Agents:     {}/agents", public_url);
    tracing::info!("   Agent TTL:  {}s", settings.agent_ttl_secs);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Serve a worker agent, registering it in the background once listening.
///
/// Registration failure never stops the server.
pub async fn serve_agent(
    config: AgentServerConfig,
    executor: Arc<dyn TaskExecutor>,
    settings: &Settings,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind agent on {}: {}", config.bind_addr(), e))?;
    serve_agent_on(listener, config, executor, settings).await
}

/// [`serve_agent`] on an already bound listener.
pub async fn serve_agent_on(
    listener: TcpListener,
    config: AgentServerConfig,
    executor: Arc<dyn TaskExecutor>,
    settings: &Settings,
) -> anyhow::Result<()> {
    config.validate()?;
    let card = agent_card::build_agent_card(&config);
    let app = agent_router(card.clone(), executor);

    tracing::info!("A2A Agent '{}' starting on http://{}", card.name, listener.local_addr()?);
    tracing::info!("   Agent Card: {}/.well-known/agent.json", config.base_url());
    tracing::info!("   JSON-RPC:   {}", card.url);

    match &settings.registration.registry_url {
        Some(registry_url) => {
            let client = A2aClient::new(settings.client.timeout())?;
            registration::spawn_registration(
                client,
                registry_url.clone(),
                card,
                settings.registration.policy(),
            );
        }
        None => tracing::warn!("A2A: no registry URL configured, skipping registration"),
    }

    axum::serve(listener, app).await?;
    Ok(())
}

/// GET /.well-known/agent.json: Agent Card discovery.
async fn get_agent_card(State(state): State<A2aState>) -> Json<AgentCard> {
    Json(state.card.as_ref().clone())
}

/// POST /a2a: JSON-RPC 2.0 endpoint. The raw body is decoded by the
/// dispatcher so unparsable JSON maps to `-32700` rather than an axum rejection.
async fn handle_jsonrpc(
    State(state): State<A2aState>,
    body: Bytes,
) -> (StatusCode, Json<JsonRpcResponse>) {
    let dispatched = state.dispatcher.handle(&body).await;
    (dispatched.status, Json(dispatched.response))
}

/// GET /agents: live registry contents after pruning.
async fn list_agents(
    State(state): State<A2aState>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let store = state.dispatcher.registry_store().ok_or(StatusCode::NOT_FOUND)?;
    let agents: HashMap<String, AgentCard> = store.list().await;
    Ok(Json(serde_json::json!({ "registered_agents": agents })))
}

/// GET /a2a/health: Health check.
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "protocol": "A2A",
    }))
}
