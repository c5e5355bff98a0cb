// ── Concierge Atoms: Core Types ────────────────────────────────────────────
// Shared data types for chat, tools, intent analysis, and model backends.
// Pure data, serde-ready, no I/O.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Chat messages ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    /// Uppercase label used when flattening a conversation into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "SYSTEM",
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
            Role::Tool => "TOOL",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage { role: Role::Assistant, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage { role: Role::System, content: content.into() }
    }
}

/// Incoming chat request from the HTTP layer.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub personality: Option<String>,
    #[serde(default = "default_true")]
    pub use_tools: bool,
    #[serde(default)]
    pub enhance_prompts: bool,
}

fn default_true() -> bool {
    true
}

// ── Streamed chat events (NDJSON) ──────────────────────────────────────────

/// One line of the chat response stream. Serialized with a `type` tag so
/// clients can switch on it without schema knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatEvent {
    /// The user's prompt was rewritten before generation. At most one per turn.
    Enhancement { original: String, enhanced: String },
    /// A tool ran before generation. One event per executed tool.
    Tool { tool: String, result: String },
    /// A chunk of generated assistant text.
    Text { content: String },
    /// Terminal event. Exactly one per turn, always last.
    Done,
}

// ── Tools ──────────────────────────────────────────────────────────────────

/// A catalog entry describing one tool. `parameters` maps parameter name to
/// a short human-readable description; ordering is stable for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// A resolved request to run one tool with concrete parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub parameters: serde_json::Value,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, parameters: serde_json::Value) -> Self {
        ToolInvocation { name: name.into(), parameters }
    }

    /// Invocation with no parameters.
    pub fn bare(name: impl Into<String>) -> Self {
        ToolInvocation { name: name.into(), parameters: serde_json::json!({}) }
    }

    /// Fetch a string parameter, if present.
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }
}

// ── Intent analysis (prompt enhancement) ───────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intent {
    Question,
    Instruction,
    Creative,
    Analysis,
    Conversation,
    Technical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Expertise {
    Basic,
    Intermediate,
    Expert,
}

/// Structured read of what the user is asking for, produced by a single
/// classification call (or a heuristic fallback when that call fails).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentAnalysis {
    pub intent: Intent,
    pub domain: String,
    pub complexity: Complexity,
    pub expertise: Expertise,
}

impl IntentAnalysis {
    /// Conservative default used when classification is unavailable.
    pub fn fallback(prompt: &str) -> Self {
        let intent = if prompt.contains('?') { Intent::Question } else { Intent::Instruction };
        IntentAnalysis {
            intent,
            domain: "general".into(),
            complexity: Complexity::Moderate,
            expertise: Expertise::Basic,
        }
    }
}

/// Which rewrite template the strategist picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Instructional,
    FewShot,
    ChainOfThought,
}

// ── Personalities ──────────────────────────────────────────────────────────

/// A selectable assistant persona: display metadata plus the system prompt
/// injected at the head of every conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Personality {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing)]
    pub system_prompt: String,
}

// ── Model backends ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Ollama,
    OpenAi,
    Anthropic,
}

impl BackendKind {
    /// Metered backends bill per token; local backends do not.
    pub fn is_metered(&self) -> bool {
        !matches!(self, BackendKind::Ollama)
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            BackendKind::Ollama => "http://localhost:11434",
            BackendKind::OpenAi => "https://api.openai.com/v1",
            BackendKind::Anthropic => "https://api.anthropic.com",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(BackendKind::Ollama),
            "openai" => Ok(BackendKind::OpenAi),
            "anthropic" => Ok(BackendKind::Anthropic),
            other => Err(format!("Unknown backend kind: {}", other)),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BackendKind::Ollama => "ollama",
            BackendKind::OpenAi => "openai",
            BackendKind::Anthropic => "anthropic",
        };
        f.write_str(s)
    }
}

/// Result of a blocking generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

// ── Tests ──────────────────────────────────────────────────────────────────
