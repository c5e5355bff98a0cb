// Concierge Engine — LLM Routes
// Status and one-shot generation go through the configured backend; model
// management (pull, delete, running) is Ollama-specific.

use super::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use log::info;
use serde::Deserialize;
use serde_json::json;

type ApiError = (StatusCode, Json<serde_json::Value>);

fn upstream_error(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::BAD_GATEWAY, Json(json!({"error": e.to_string()})))
}

/// GET /api/llm/status
pub async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let connected = state.backend.check_connection().await;
    let running = state.ollama.running_models().await.unwrap_or_default();
    Json(json!({
        "backend": state.config.backend.to_string(),
        "connected": connected,
        "base_url": state.ollama.base_url(),
        "default_model": state.config.default_model,
        "running_models": running,
    }))
}

/// GET /api/llm/models
pub async fn models(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let models = state.backend.list_models().await.map_err(upstream_error)?;
    Ok(Json(json!({"models": models})))
}

/// POST /api/llm/models/:name/pull
pub async fn pull_model(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!("[server] Pull requested for model '{}'", name);
    state.ollama.pull_model(&name).await.map_err(upstream_error)?;
    Ok(Json(json!({"status": "pulled", "model": name})))
}

/// DELETE /api/llm/models/:name
pub async fn delete_model(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.ollama.delete_model(&name).await.map_err(upstream_error)?;
    Ok(Json(json!({"status": "deleted", "model": name})))
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
}

/// POST /api/llm/generate — one-shot blocking generation.
pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let model = req.model.unwrap_or_else(|| state.config.default_model.clone());
    let generation = state
        .backend
        .generate(&req.prompt, &model, req.system.as_deref())
        .await
        .map_err(upstream_error)?;
    Ok(Json(json!({
        "response": generation.text,
        "model": generation.model,
        "eval_count": generation.eval_count,
    })))
}
