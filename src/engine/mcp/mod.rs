// Concierge Engine — MCP (Model Context Protocol)
//
// Stdio clients for the external tool services: JSON-RPC framing, a lazy
// per-service client, and the manager that owns the roster.

pub mod client;
pub mod manager;
pub mod transport;
pub mod types;

pub use client::ServiceClient;
pub use manager::ServiceManager;
