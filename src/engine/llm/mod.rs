// Concierge Engine — Model Backends
// AnyBackend wraps Arc<dyn LlmBackend> so adding a new backend never
// requires touching the call sites — implement the trait, add a factory arm.

pub mod anthropic;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicBackend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

use crate::atoms::error::EngineResult;
use crate::atoms::types::{BackendKind, Generation};
use crate::config::Config;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// A lazily-produced stream of generated text chunks. Dropping the stream
/// aborts the underlying HTTP request.
pub type TextStream = BoxStream<'static, EngineResult<String>>;

/// The seam between the orchestrator and a concrete model API.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Blocking generation: one prompt in, one completed text out.
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        system: Option<&str>,
    ) -> EngineResult<Generation>;

    /// Streaming generation: text chunks as the model produces them.
    async fn generate_stream(&self, prompt: &str, model: &str) -> EngineResult<TextStream>;

    /// Cheap reachability probe. Never errors; unreachable is just `false`.
    async fn check_connection(&self) -> bool;

    /// Models available on this backend, as backend-shaped JSON objects.
    async fn list_models(&self) -> EngineResult<Vec<serde_json::Value>>;
}

// ── Backend factory ────────────────────────────────────────────────────────

/// Type-erased model backend. Callers hold `AnyBackend` and never know which
/// concrete API is in use.
#[derive(Clone)]
pub struct AnyBackend(Arc<dyn LlmBackend>);

impl AnyBackend {
    /// Construct the configured concrete backend.
    pub fn from_config(config: &Config) -> Self {
        let backend: Arc<dyn LlmBackend> = match config.backend {
            BackendKind::Ollama => Arc::new(OllamaBackend::new(&config.ollama_base_url)),
            BackendKind::OpenAi => Arc::new(OpenAiBackend::new(
                &config.openai_base_url,
                config.openai_api_key.as_deref().unwrap_or_default(),
            )),
            BackendKind::Anthropic => Arc::new(AnthropicBackend::new(
                &config.anthropic_base_url,
                config.anthropic_api_key.as_deref().unwrap_or_default(),
            )),
        };
        AnyBackend(backend)
    }

    /// Wrap an existing implementation (used by tests to inject mocks).
    pub fn from_impl(backend: Arc<dyn LlmBackend>) -> Self {
        AnyBackend(backend)
    }

    pub fn kind(&self) -> BackendKind {
        self.0.kind()
    }

    pub async fn generate(
        &self,
        prompt: &str,
        model: &str,
        system: Option<&str>,
    ) -> EngineResult<Generation> {
        self.0.generate(prompt, model, system).await
    }

    pub async fn generate_stream(&self, prompt: &str, model: &str) -> EngineResult<TextStream> {
        self.0.generate_stream(prompt, model).await
    }

    pub async fn check_connection(&self) -> bool {
        self.0.check_connection().await
    }

    pub async fn list_models(&self) -> EngineResult<Vec<serde_json::Value>> {
        self.0.list_models().await
    }
}
