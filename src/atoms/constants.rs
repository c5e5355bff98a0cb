// Concierge Engine — Constants

/// MCP protocol version spoken during the `initialize` handshake.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Default per-call timeout for external service tool calls (seconds).
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// The knowledge service runs semantic search and gets a longer budget.
pub const KNOWLEDGE_TOOL_TIMEOUT_SECS: u64 = 60;

/// Health probes must answer within this bound or report unhealthy.
pub const HEALTH_PROBE_TIMEOUT_SECS: u64 = 2;

/// Timeout for the MCP initialize handshake and tools/list exchange.
pub const MCP_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// Timeout for a blocking LLM generation call (seconds).
pub const GENERATE_TIMEOUT_SECS: u64 = 120;

/// Timeout for LLM connection probes (seconds).
pub const CONNECT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Timeout for web search requests (seconds).
pub const WEB_SEARCH_TIMEOUT_SECS: u64 = 10;

/// Timeout for transit gateway requests (seconds).
pub const TRANSIT_TIMEOUT_SECS: u64 = 5;

/// An enhanced prompt longer than this multiple of the original is rejected.
pub const ENHANCEMENT_MAX_GROWTH: usize = 3;

/// How many related topics a web search summary includes.
pub const WEB_SEARCH_MAX_TOPICS: usize = 3;
