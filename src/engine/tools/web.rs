// Concierge Engine — Network Tools
// Web search via the DuckDuckGo instant-answer API and lookups against the
// local transit gateway. Both carry short timeouts; a slow upstream turns
// into a tool error, never a stalled chat turn.

use super::{require_param, ToolContext};
use crate::atoms::constants::{TRANSIT_TIMEOUT_SECS, WEB_SEARCH_MAX_TOPICS, WEB_SEARCH_TIMEOUT_SECS};
use crate::atoms::types::ToolInvocation;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const DDG_API: &str = "https://api.duckduckgo.com/";

pub async fn web_search(
    ctx: Arc<ToolContext>,
    invocation: ToolInvocation,
) -> Result<String, String> {
    let query = require_param(&invocation, "query")?;
    let url = format!(
        "{}?q={}&format=json&no_html=1&skip_disambig=1",
        DDG_API,
        urlencoding::encode(&query)
    );

    let resp = ctx
        .http
        .get(&url)
        .timeout(Duration::from_secs(WEB_SEARCH_TIMEOUT_SECS))
        .send()
        .await
        .map_err(|e| format!("Search request failed: {}", e))?;
    if !resp.status().is_success() {
        return Err(format!("Search returned HTTP {}", resp.status().as_u16()));
    }
    let body: Value = resp.json().await.map_err(|e| format!("Bad search response: {}", e))?;

    Ok(summarize_search(&query, &body))
}

/// Reduce an instant-answer payload to a few lines: the abstract if present,
/// then up to a handful of related topics.
fn summarize_search(query: &str, body: &Value) -> String {
    let mut lines = Vec::new();

    let abstract_text = body["AbstractText"].as_str().unwrap_or("");
    if !abstract_text.is_empty() {
        lines.push(abstract_text.to_string());
    }

    if let Some(topics) = body["RelatedTopics"].as_array() {
        for topic in topics.iter().take(WEB_SEARCH_MAX_TOPICS) {
            if let Some(text) = topic["Text"].as_str() {
                if !text.is_empty() {
                    lines.push(format!("- {}", text));
                }
            }
        }
    }

    if lines.is_empty() {
        format!("No instant answer found for '{}'.", query)
    } else {
        lines.join("\n")
    }
}

// ── Transit gateway ────────────────────────────────────────────────────────

pub async fn transit(ctx: Arc<ToolContext>, invocation: ToolInvocation) -> Result<String, String> {
    let base = transit_base(&ctx)?;
    let mut url = format!("{}/departures", base);
    if let Some(stop) = invocation.str_param("stop") {
        url.push_str(&format!("?stop={}", urlencoding::encode(stop)));
    }
    let body = transit_get(&ctx, &url).await?;
    Ok(summarize_departures(&body))
}

pub async fn transit_route(
    ctx: Arc<ToolContext>,
    invocation: ToolInvocation,
) -> Result<String, String> {
    let base = transit_base(&ctx)?;
    let from = require_param(&invocation, "from")?;
    let to = require_param(&invocation, "to")?;
    let url = format!(
        "{}/route?from={}&to={}",
        base,
        urlencoding::encode(&from),
        urlencoding::encode(&to)
    );
    let body = transit_get(&ctx, &url).await?;

    let summary = body["summary"].as_str().unwrap_or("");
    if summary.is_empty() {
        Ok(format!("No route found from {} to {}.", from, to))
    } else {
        Ok(summary.to_string())
    }
}

fn transit_base(ctx: &ToolContext) -> Result<String, String> {
    ctx.transit_api_url
        .clone()
        .map(|u| u.trim_end_matches('/').to_string())
        .ok_or_else(|| "Transit gateway is not configured".to_string())
}

async fn transit_get(ctx: &ToolContext, url: &str) -> Result<Value, String> {
    let resp = ctx
        .http
        .get(url)
        .timeout(Duration::from_secs(TRANSIT_TIMEOUT_SECS))
        .send()
        .await
        .map_err(|e| format!("Transit request failed: {}", e))?;
    if !resp.status().is_success() {
        return Err(format!("Transit gateway returned HTTP {}", resp.status().as_u16()));
    }
    resp.json().await.map_err(|e| format!("Bad transit response: {}", e))
}

fn summarize_departures(body: &Value) -> String {
    let departures = match body["departures"].as_array() {
        Some(d) if !d.is_empty() => d,
        _ => return "No upcoming departures.".to_string(),
    };
    let mut lines = vec!["Next departures:".to_string()];
    for dep in departures.iter().take(5) {
        let line = dep["line"].as_str().unwrap_or("?");
        let towards = dep["towards"].as_str().unwrap_or("?");
        let minutes = dep["in_minutes"].as_u64().unwrap_or(0);
        lines.push(format!("- {} towards {} in {} min", line, towards, minutes));
    }
    lines.join("\n")
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tools::tests::test_context;
    use serde_json::json;

    #[test]
    fn test_summarize_search_abstract_and_topics() {
        let body = json!({
            "AbstractText": "Rust is a systems programming language.",
            "RelatedTopics": [
                {"Text": "Rust (video game)"},
                {"Text": "Rust Belt"},
                {"Text": "Rust fungus"},
                {"Text": "ignored, beyond the cap"}
            ]
        });
        let out = summarize_search("rust", &body);
        assert!(out.starts_with("Rust is a systems"));
        assert_eq!(out.matches("- ").count(), WEB_SEARCH_MAX_TOPICS);
        assert!(!out.contains("beyond the cap"));
    }

    #[test]
    fn test_summarize_search_empty_payload() {
        let body = json!({"AbstractText": "", "RelatedTopics": []});
        assert_eq!(summarize_search("xyzzy", &body), "No instant answer found for 'xyzzy'.");
    }

    #[test]
    fn test_summarize_departures() {
        let body = json!({"departures": [
            {"line": "U1", "towards": "Leopoldau", "in_minutes": 3},
            {"line": "D", "towards": "Nussdorf", "in_minutes": 7}
        ]});
        let out = summarize_departures(&body);
        assert!(out.contains("U1 towards Leopoldau in 3 min"));
        assert!(out.contains("D towards Nussdorf in 7 min"));
    }

    #[tokio::test]
    async fn test_transit_unconfigured_errors() {
        let err = transit(test_context(), ToolInvocation::bare("transit")).await.unwrap_err();
        assert!(err.contains("not configured"));
    }
}
