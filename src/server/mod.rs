// Concierge Engine — HTTP Server
//
// Application state and routing. All collaborators are constructed once at
// startup and injected through `AppState`; nothing global, nothing lazy.

pub mod chat;
pub mod health;
pub mod llm;

use crate::config::Config;
use crate::engine::chat::ChatEngine;
use crate::engine::intent::KeywordDetector;
use crate::engine::llm::{AnyBackend, OllamaBackend};
use crate::engine::mcp::ServiceManager;
use crate::engine::records::InMemoryRecordStore;
use crate::engine::tools::{ToolContext, ToolRegistry};
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: AnyBackend,
    /// Management endpoints talk to the local Ollama daemon regardless of
    /// which backend handles chat.
    pub ollama: Arc<OllamaBackend>,
    pub services: Arc<ServiceManager>,
    pub chat: Arc<ChatEngine>,
}

impl AppState {
    pub fn build(config: Config) -> Self {
        let backend = AnyBackend::from_config(&config);
        let ollama = Arc::new(OllamaBackend::new(&config.ollama_base_url));
        let services = Arc::new(ServiceManager::new(config.services.clone()));

        let ctx = Arc::new(ToolContext {
            backend: backend.clone(),
            services: Arc::clone(&services),
            records: Arc::new(InMemoryRecordStore::new()),
            http: reqwest::Client::new(),
            transit_api_url: config.transit_api_url.clone(),
            model: config.default_model.clone(),
        });
        let registry = Arc::new(ToolRegistry::new(ctx));

        let chat = Arc::new(ChatEngine::new(
            backend.clone(),
            registry,
            Arc::new(KeywordDetector::new()),
            config.default_model.clone(),
        ));

        AppState { config: Arc::new(config), backend, ollama, services, chat }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat/stream", post(chat::stream))
        .route("/api/chat/personalities", get(chat::personalities))
        .route("/api/chat/tools", get(chat::tools))
        .route("/api/llm/status", get(llm::status))
        .route("/api/llm/models", get(llm::models))
        .route("/api/llm/models/:name/pull", post(llm::pull_model))
        .route("/api/llm/models/:name", delete(llm::delete_model))
        .route("/api/llm/generate", post(llm::generate))
        .route("/api/services/health", get(health::services_health))
        .route("/api/services/status", get(health::services_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
