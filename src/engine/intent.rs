// Concierge Engine — Intent Detection
//
// A fixed-order table of keyword rules mapping a user message to tool
// invocations. Pure and deterministic: same message, same invocations.
// Every rule checks independently, so one message can fire several tools.

use crate::atoms::types::ToolInvocation;
use regex::Regex;
use serde_json::json;

pub trait IntentDetector: Send + Sync {
    /// Tool invocations implied by the message, in rule-table order.
    /// No match means an empty list, never an error.
    fn detect(&self, message: &str) -> Vec<ToolInvocation>;
}

// ── Keyword detector ───────────────────────────────────────────────────────

pub struct KeywordDetector {
    /// Bare arithmetic like "12 * 8" with no keyword cue.
    math_cue: Regex,
    /// Longest run of digits, operators, parens, and dots in the message.
    math_expr: Regex,
}

impl Default for KeywordDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordDetector {
    pub fn new() -> Self {
        // Static patterns; compilation failure would be caught by the tests.
        KeywordDetector {
            math_cue: Regex::new(r"\d+\s*[-+*/]\s*\d+").expect("static pattern compiles"),
            math_expr: Regex::new(r"[\d+\-*/().\s]*\d[\d+\-*/().\s]*")
                .expect("static pattern compiles"),
        }
    }

    fn extract_expression(&self, message: &str) -> Option<String> {
        self.math_expr
            .find_iter(message)
            .map(|m| m.as_str().trim())
            .filter(|s| s.chars().any(|c| "+-*/".contains(c)))
            .max_by_key(|s| s.len())
            .map(|s| s.to_string())
    }
}

impl IntentDetector for KeywordDetector {
    fn detect(&self, message: &str) -> Vec<ToolInvocation> {
        let lower = message.to_lowercase();
        let mut out = Vec::new();

        // Calculator: keyword cue or bare arithmetic. A cue with no
        // evaluable substring still fires; the tool reports the bad
        // expression inline.
        if contains_any(&lower, &["calculate", "compute", "what is", "how much is"])
            || self.math_cue.is_match(&lower)
        {
            let expr = self.extract_expression(message).unwrap_or_default();
            out.push(ToolInvocation::new("calculator", json!({"expression": expr})));
        }

        // Date and time.
        if contains_any(
            &lower,
            &["what time", "current time", "what date", "today's date", "what day is"],
        ) {
            out.push(ToolInvocation::bare("datetime"));
        }

        // Web search: the trigger phrase is stripped to form the query.
        for trigger in ["search the web for", "search for", "look up", "google"] {
            if let Some(idx) = lower.find(trigger) {
                let query = rest_after(message, idx + trigger.len()).trim_end_matches('?').trim();
                if !query.is_empty() {
                    out.push(ToolInvocation::new("web_search", json!({"query": query})));
                }
                break;
            }
        }

        // Personal records.
        if contains_any(&lower, &["todo", "to-do", "my tasks", "task list"]) {
            out.push(ToolInvocation::bare("get_todos"));
        }
        if contains_any(&lower, &["calendar", "my schedule", "appointments", "meetings today"]) {
            out.push(ToolInvocation::bare("get_calendar"));
        }

        // Knowledge base.
        for trigger in ["search my notes for", "search my notes", "find notes about", "find notes"]
        {
            if let Some(idx) = lower.find(trigger) {
                let query = rest_after(message, idx + trigger.len()).trim_end_matches('?').trim();
                out.push(ToolInvocation::new("search_knowledge", json!({"query": query})));
                break;
            }
        }
        for trigger in ["read note", "open note", "show me the note"] {
            if let Some(idx) = lower.find(trigger) {
                let title = rest_after(message, idx + trigger.len());
                out.push(ToolInvocation::new("read_note", json!({"title": title})));
                break;
            }
        }
        for trigger in ["create a note", "take a note", "new note"] {
            if let Some(idx) = lower.find(trigger) {
                let content = rest_after(message, idx + trigger.len()).trim_start_matches(':').trim();
                out.push(ToolInvocation::new("create_note", json!({"content": content})));
                break;
            }
        }
        if contains_any(&lower, &["recent notes", "latest notes"]) {
            out.push(ToolInvocation::bare("recent_notes"));
        }

        // Home.
        if contains_any(&lower, &["weather", "forecast", "temperature outside"]) {
            out.push(ToolInvocation::bare("get_weather"));
        }
        if contains_any(&lower, &["turn on the light", "lights on", "turn the lights on"]) {
            out.push(ToolInvocation::new("control_lights", json!({"state": "on"})));
        } else if contains_any(&lower, &["turn off the light", "lights off", "turn the lights off"])
        {
            out.push(ToolInvocation::new("control_lights", json!({"state": "off"})));
        }
        if contains_any(&lower, &["list lights", "what lights", "which lights"]) {
            out.push(ToolInvocation::bare("list_lights"));
        }
        if lower.contains("camera") {
            out.push(ToolInvocation::bare("camera_status"));
        }
        if lower.contains("doorbell") {
            out.push(ToolInvocation::bare("doorbell_events"));
        }

        // Transit.
        if contains_any(&lower, &["next bus", "next tram", "next train", "departure", "transit"]) {
            out.push(ToolInvocation::bare("transit"));
        }

        out
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Slice the original message after a byte offset found in its lowercased
/// form. Lowercasing can shift byte offsets for a few scripts, so an
/// off-boundary index degrades to an empty remainder instead of panicking.
fn rest_after(message: &str, offset: usize) -> &str {
    message.get(offset..).unwrap_or("").trim()
}

// ── Tests ──────────────────────────────────────────────────────────────────
