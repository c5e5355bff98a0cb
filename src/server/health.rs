// Concierge Engine — Health Route

use super::AppState;
use axum::extract::State;
use axum::Json;
use serde_json::json;

/// GET /api/services/health — concurrent bounded probe of every service
/// plus the model backend. A hung service reports false; it cannot stall
/// the others.
pub async fn services_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let (services, llm) =
        tokio::join!(state.services.check_health(), state.backend.check_connection());
    let mut report = serde_json::Map::new();
    report.insert("llm".to_string(), json!(llm));
    for (name, healthy) in services {
        report.insert(name, json!(healthy));
    }
    Json(serde_json::Value::Object(report))
}

/// GET /api/services/status — connection state and tool counts without
/// probing; reflects what lazy connection has established so far.
pub async fn services_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let statuses = state.services.statuses().await;
    Json(serde_json::json!({"services": statuses}))
}
