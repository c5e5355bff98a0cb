// Concierge Engine — Tool Catalog & Executor
//
// Dispatch is a name → handler registry, never a conditional chain. Every
// handler failure is caught at the execute boundary and flattened into an
// inline string so a broken tool can only dent one chat turn.

pub mod calculator;
pub mod catalog;
pub mod generative;
pub mod local;
pub mod services;
pub mod web;

use crate::atoms::types::ToolInvocation;
use crate::engine::llm::AnyBackend;
use crate::engine::mcp::ServiceManager;
use crate::engine::records::RecordStore;
use futures::future::BoxFuture;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// Everything a handler may need, injected once at startup.
pub struct ToolContext {
    pub backend: AnyBackend,
    pub services: Arc<ServiceManager>,
    pub records: Arc<dyn RecordStore>,
    pub http: reqwest::Client,
    pub transit_api_url: Option<String>,
    /// Model used by generative tools.
    pub model: String,
}

type Handler = fn(Arc<ToolContext>, ToolInvocation) -> BoxFuture<'static, Result<String, String>>;

pub struct ToolRegistry {
    ctx: Arc<ToolContext>,
    handlers: HashMap<&'static str, Handler>,
}

impl ToolRegistry {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        let mut handlers: HashMap<&'static str, Handler> = HashMap::new();

        // Pure / local
        handlers.insert("calculator", |ctx, inv| Box::pin(local::calculator(ctx, inv)));
        handlers.insert("datetime", |ctx, inv| Box::pin(local::datetime(ctx, inv)));
        handlers.insert("get_todos", |ctx, inv| Box::pin(local::get_todos(ctx, inv)));
        handlers.insert("get_calendar", |ctx, inv| Box::pin(local::get_calendar(ctx, inv)));

        // Network
        handlers.insert("web_search", |ctx, inv| Box::pin(web::web_search(ctx, inv)));
        handlers.insert("transit", |ctx, inv| Box::pin(web::transit(ctx, inv)));
        handlers.insert("transit_route", |ctx, inv| Box::pin(web::transit_route(ctx, inv)));

        // Delegated to external services
        for name in services::SERVICE_TOOLS {
            handlers.insert(name, |ctx, inv| Box::pin(services::run(ctx, inv)));
        }

        // Generative
        for name in generative::GENERATIVE_TOOLS {
            handlers.insert(name, |ctx, inv| Box::pin(generative::run(ctx, inv)));
        }

        ToolRegistry { ctx, handlers }
    }

    /// Run one tool. Never fails: errors become inline strings.
    pub async fn execute(&self, invocation: &ToolInvocation) -> String {
        let handler = match self.handlers.get(invocation.name.as_str()) {
            Some(h) => *h,
            None => return format!("Unknown tool: {}", invocation.name),
        };
        debug!("[tools] Executing '{}'", invocation.name);
        match handler(Arc::clone(&self.ctx), invocation.clone()).await {
            Ok(result) => result,
            Err(e) => {
                warn!("[tools] '{}' failed: {}", invocation.name, e);
                format!("Tool error: {}", e)
            }
        }
    }

    pub fn known_tools(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// Pull a required string parameter or produce the standard error message.
pub(crate) fn require_param(invocation: &ToolInvocation, key: &str) -> Result<String, String> {
    invocation
        .str_param(key)
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required parameter '{}' for {}", key, invocation.name))
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::records::InMemoryRecordStore;

    pub(crate) fn test_context() -> Arc<ToolContext> {
        let config = Config {
            bind_addr: "127.0.0.1:0".into(),
            backend: crate::atoms::types::BackendKind::Ollama,
            default_model: "test-model".into(),
            ollama_base_url: "http://127.0.0.1:9".into(),
            openai_api_key: None,
            openai_base_url: "http://127.0.0.1:9".into(),
            anthropic_api_key: None,
            anthropic_base_url: "http://127.0.0.1:9".into(),
            transit_api_url: None,
            services: vec![],
        };
        Arc::new(ToolContext {
            backend: AnyBackend::from_config(&config),
            services: Arc::new(ServiceManager::new(vec![])),
            records: Arc::new(InMemoryRecordStore::new()),
            http: reqwest::Client::new(),
            transit_api_url: None,
            model: config.default_model.clone(),
        })
    }

    #[tokio::test]
    async fn test_unknown_tool_sentinel_is_verbatim() {
        let registry = ToolRegistry::new(test_context());
        let result = registry.execute(&ToolInvocation::bare("frobnicate")).await;
        assert_eq!(result, "Unknown tool: frobnicate");
    }

    #[tokio::test]
    async fn test_handler_error_becomes_inline_string() {
        let registry = ToolRegistry::new(test_context());
        // calculator with a missing parameter fails inside the handler
        let result = registry.execute(&ToolInvocation::bare("calculator")).await;
        assert!(result.starts_with("Tool error: "));
    }

    #[tokio::test]
    async fn test_calculator_through_registry() {
        let registry = ToolRegistry::new(test_context());
        let inv = ToolInvocation::new("calculator", serde_json::json!({"expression": "12 * 8"}));
        assert_eq!(registry.execute(&inv).await, "12 * 8 = 96");
    }

    #[test]
    fn test_catalog_and_registry_agree() {
        let registry = ToolRegistry::new(test_context());
        let known = registry.known_tools();
        for descriptor in catalog::catalog() {
            assert!(
                known.contains(&descriptor.name.as_str()),
                "catalog lists '{}' but no handler is registered",
                descriptor.name
            );
        }
        assert_eq!(known.len(), catalog::catalog().len());
    }
}
