// Concierge Engine — Chat Routes

use super::AppState;
use crate::atoms::types::ChatRequest;
use crate::engine::chat;
use crate::engine::tools::catalog;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::convert::Infallible;
use tokio_stream::StreamExt as _;

/// POST /api/chat/stream — one chat turn as NDJSON events.
/// The body stream is the orchestrator's generator; a client disconnect
/// drops it and cancels the in-flight generation.
pub async fn stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let events = state.chat.clone().stream(request);
    let lines = events.map(|event| {
        // ChatEvent serialization cannot fail; the fallback keeps the
        // stream well-formed if it ever does.
        let line = serde_json::to_string(&event)
            .unwrap_or_else(|_| r#"{"type":"done"}"#.to_string());
        Ok::<_, Infallible>(format!("{}\n", line))
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(Body::from_stream(lines))
        .unwrap_or_else(|_| Body::empty().into_response())
}

/// GET /api/chat/personalities
pub async fn personalities() -> Json<serde_json::Value> {
    let list: Vec<_> = chat::personalities()
        .into_iter()
        .map(|p| json!({"id": p.id, "name": p.name, "description": p.description}))
        .collect();
    Json(json!({"personalities": list}))
}

/// GET /api/chat/tools
pub async fn tools() -> Json<serde_json::Value> {
    Json(json!({"tools": catalog::catalog()}))
}
