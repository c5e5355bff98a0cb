// Concierge Engine — Service-Delegated Tools
// Handlers that forward to an external service over MCP. The remote reply is
// already text; it is passed through after a length cap so one verbose
// service cannot flood the prompt.

use super::ToolContext;
use crate::atoms::types::ToolInvocation;
use std::sync::Arc;

/// Longest service reply we will inline into a chat turn.
const MAX_RESULT_CHARS: usize = 4000;

/// Tool name → owning service. The remote tool name matches the local one.
const ROUTES: [(&str, &str); 18] = [
    // knowledge base
    ("search_knowledge", "knowledge"),
    ("read_note", "knowledge"),
    ("create_note", "knowledge"),
    ("recent_notes", "knowledge"),
    ("edit_note", "knowledge"),
    ("link_notes", "knowledge"),
    ("create_daily_note", "knowledge"),
    ("search_by_tag", "knowledge"),
    ("create_project", "knowledge"),
    ("list_projects", "knowledge"),
    // home automation
    ("get_weather", "home"),
    ("control_lights", "home"),
    ("list_lights", "home"),
    ("camera_status", "home"),
    ("doorbell_events", "home"),
    // games
    ("play_chess", "games"),
    ("analyze_position", "games"),
    ("play_go", "games"),
];

/// All tool names served by this module, for registry construction.
pub const SERVICE_TOOLS: [&str; 18] = [
    "search_knowledge",
    "read_note",
    "create_note",
    "recent_notes",
    "edit_note",
    "link_notes",
    "create_daily_note",
    "search_by_tag",
    "create_project",
    "list_projects",
    "get_weather",
    "control_lights",
    "list_lights",
    "camera_status",
    "doorbell_events",
    "play_chess",
    "analyze_position",
    "play_go",
];

fn route(tool: &str) -> Option<&'static str> {
    ROUTES.iter().find(|(name, _)| *name == tool).map(|(_, service)| *service)
}

pub async fn run(ctx: Arc<ToolContext>, invocation: ToolInvocation) -> Result<String, String> {
    let service = route(&invocation.name)
        .ok_or_else(|| format!("No service route for tool {}", invocation.name))?;
    let reply = ctx
        .services
        .call(service, &invocation.name, invocation.parameters.clone())
        .await
        .map_err(|e| e.to_string())?;
    Ok(cap(reply))
}

fn cap(mut reply: String) -> String {
    if reply.chars().count() > MAX_RESULT_CHARS {
        reply = reply.chars().take(MAX_RESULT_CHARS).collect();
        reply.push_str("…");
    }
    reply
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tools::tests::test_context;
    use serde_json::json;

    #[test]
    fn test_every_service_tool_has_a_route() {
        for name in SERVICE_TOOLS {
            assert!(route(name).is_some(), "tool '{}' has no route", name);
        }
        assert_eq!(SERVICE_TOOLS.len(), ROUTES.len());
    }

    #[test]
    fn test_route_targets() {
        assert_eq!(route("search_knowledge"), Some("knowledge"));
        assert_eq!(route("get_weather"), Some("home"));
        assert_eq!(route("play_go"), Some("games"));
        assert_eq!(route("calculator"), None);
    }

    #[tokio::test]
    async fn test_unconfigured_service_is_a_string_error() {
        // The test context configures no services, so delegation must fail
        // with an error string, not panic or hang.
        let inv = ToolInvocation::new("get_weather", json!({}));
        let err = run(test_context(), inv).await.unwrap_err();
        assert!(err.contains("home"));
    }

    #[test]
    fn test_cap_truncates_long_replies() {
        let long = "x".repeat(MAX_RESULT_CHARS + 100);
        let capped = cap(long);
        assert!(capped.chars().count() <= MAX_RESULT_CHARS + 1);
        assert!(capped.ends_with('…'));
    }
}
