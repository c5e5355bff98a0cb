// Concierge Engine — Configuration
//
// Resolved process configuration, read once from environment variables at
// startup. The engine layers consume the resolved values and never touch
// the environment themselves.

use crate::atoms::constants::{DEFAULT_TOOL_TIMEOUT_SECS, KNOWLEDGE_TOOL_TIMEOUT_SECS};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::BackendKind;
use log::warn;
use std::collections::HashMap;

/// Fixed roster of external tool services. Each is backed by an MCP server
/// process whose command line comes from `<NAME>_MCP_CMD`.
pub const SERVICE_NAMES: [&str; 6] = ["media", "library", "photos", "home", "knowledge", "games"];

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Registry key, e.g. "knowledge".
    pub name: String,
    /// Executable to spawn.
    pub command: String,
    pub args: Vec<String>,
    /// Extra environment for the child process.
    pub env: HashMap<String, String>,
    /// Per-call timeout for tools/call requests.
    pub call_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub backend: BackendKind,
    pub default_model: String,
    pub ollama_base_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub transit_api_url: Option<String>,
    pub services: Vec<ServiceConfig>,
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> EngineResult<Self> {
        let backend = match std::env::var("CONCIERGE_BACKEND") {
            Ok(v) => v.parse::<BackendKind>().map_err(EngineError::Config)?,
            Err(_) => BackendKind::Ollama,
        };

        let default_model = env_or("CONCIERGE_DEFAULT_MODEL", "llama3.2");

        // Metered backends are unusable without a key; fail fast at startup.
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let anthropic_api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        match backend {
            BackendKind::OpenAi if openai_api_key.is_none() => {
                return Err(EngineError::Config(
                    "CONCIERGE_BACKEND=openai requires OPENAI_API_KEY".into(),
                ));
            }
            BackendKind::Anthropic if anthropic_api_key.is_none() => {
                return Err(EngineError::Config(
                    "CONCIERGE_BACKEND=anthropic requires ANTHROPIC_API_KEY".into(),
                ));
            }
            _ => {}
        }

        Ok(Config {
            bind_addr: env_or("CONCIERGE_BIND", "127.0.0.1:8100"),
            backend,
            default_model,
            ollama_base_url: env_or("OLLAMA_BASE_URL", BackendKind::Ollama.default_base_url()),
            openai_api_key,
            openai_base_url: env_or("OPENAI_BASE_URL", BackendKind::OpenAi.default_base_url()),
            anthropic_api_key,
            anthropic_base_url: env_or(
                "ANTHROPIC_BASE_URL",
                BackendKind::Anthropic.default_base_url(),
            ),
            transit_api_url: std::env::var("TRANSIT_API_URL").ok(),
            services: service_configs_from_env(),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read `<NAME>_MCP_CMD` for each known service. A missing variable means
/// the service is not configured on this host; it is simply skipped and the
/// corresponding tools will report a connection error when invoked.
fn service_configs_from_env() -> Vec<ServiceConfig> {
    SERVICE_NAMES
        .iter()
        .filter_map(|name| {
            let var = format!("{}_MCP_CMD", name.to_ascii_uppercase());
            let cmdline = std::env::var(&var).ok()?;
            match parse_command_line(&cmdline) {
                Some((command, args)) => Some(ServiceConfig {
                    name: name.to_string(),
                    command,
                    args,
                    env: HashMap::new(),
                    call_timeout_secs: if *name == "knowledge" {
                        KNOWLEDGE_TOOL_TIMEOUT_SECS
                    } else {
                        DEFAULT_TOOL_TIMEOUT_SECS
                    },
                }),
                None => {
                    warn!("[config] {} is set but empty, skipping service '{}'", var, name);
                    None
                }
            }
        })
        .collect()
}

/// Split a command line on whitespace. Quoting is not supported; paths with
/// spaces should use a wrapper script.
fn parse_command_line(cmdline: &str) -> Option<(String, Vec<String>)> {
    let mut parts = cmdline.split_whitespace().map(String::from);
    let command = parts.next()?;
    Some((command, parts.collect()))
}

// ── Tests ──────────────────────────────────────────────────────────────────
