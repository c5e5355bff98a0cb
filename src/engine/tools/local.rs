// Concierge Engine — Local Tools
// Handlers that need no network: arithmetic, clock, and record lookups.

use super::ToolContext;
use crate::atoms::types::ToolInvocation;
use chrono::Local;
use std::sync::Arc;

pub async fn calculator(
    _ctx: Arc<ToolContext>,
    invocation: ToolInvocation,
) -> Result<String, String> {
    // A missing or empty expression falls through to the evaluator, which
    // reports it as a parse error.
    let expression = invocation.str_param("expression").unwrap_or_default();
    super::calculator::run(expression)
}

pub async fn datetime(
    _ctx: Arc<ToolContext>,
    _invocation: ToolInvocation,
) -> Result<String, String> {
    let now = Local::now();
    Ok(format!(
        "It is {} on {}.",
        now.format("%H:%M"),
        now.format("%A, %B %-d, %Y")
    ))
}

pub async fn get_todos(
    ctx: Arc<ToolContext>,
    _invocation: ToolInvocation,
) -> Result<String, String> {
    let todos = ctx.records.todos().await.map_err(|e| e.to_string())?;
    if todos.is_empty() {
        return Ok("No open todos.".to_string());
    }
    let mut lines = vec![format!("{} open todo(s):", todos.len())];
    for todo in todos {
        match todo.due {
            Some(due) => lines.push(format!("- {} (due {})", todo.title, due)),
            None => lines.push(format!("- {}", todo.title)),
        }
    }
    Ok(lines.join("\n"))
}

pub async fn get_calendar(
    ctx: Arc<ToolContext>,
    _invocation: ToolInvocation,
) -> Result<String, String> {
    let events = ctx.records.calendar_events().await.map_err(|e| e.to_string())?;
    if events.is_empty() {
        return Ok("No upcoming calendar events.".to_string());
    }
    let mut lines = vec![format!("{} upcoming event(s):", events.len())];
    for event in events {
        match event.location {
            Some(loc) => lines.push(format!("- {} at {} ({})", event.title, event.start, loc)),
            None => lines.push(format!("- {} at {}", event.title, event.start)),
        }
    }
    Ok(lines.join("\n"))
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tools::tests::test_context;

    #[tokio::test]
    async fn test_calculator_requires_expression() {
        let err = calculator(test_context(), ToolInvocation::bare("calculator")).await;
        assert!(err.unwrap_err().contains("expression"));
    }

    #[tokio::test]
    async fn test_calculator_empty_expression_is_an_error_string() {
        // Detection can forward a cue with nothing evaluable; the handler
        // answers with a descriptive error, not a crash.
        let invocation =
            ToolInvocation::new("calculator", serde_json::json!({"expression": ""}));
        let err = calculator(test_context(), invocation).await.unwrap_err();
        assert!(err.contains("Empty expression"));
    }

    #[tokio::test]
    async fn test_datetime_mentions_time() {
        let out = datetime(test_context(), ToolInvocation::bare("datetime")).await.unwrap();
        assert!(out.starts_with("It is "));
        assert!(out.contains(':'));
    }

    #[tokio::test]
    async fn test_empty_records() {
        let out = get_todos(test_context(), ToolInvocation::bare("get_todos")).await.unwrap();
        assert_eq!(out, "No open todos.");
        let out =
            get_calendar(test_context(), ToolInvocation::bare("get_calendar")).await.unwrap();
        assert_eq!(out, "No upcoming calendar events.");
    }
}
