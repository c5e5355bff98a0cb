// Concierge Engine — Service Client
//
// One client per external tool service. The child process is spawned lazily
// on first use; a dead transport is detected and reconnected transparently.
// Calls are serialized per client and bounded by the configured timeout.

use super::transport::StdioTransport;
use super::types::*;
use crate::atoms::constants::{
    HEALTH_PROBE_TIMEOUT_SECS, MCP_HANDSHAKE_TIMEOUT_SECS, MCP_PROTOCOL_VERSION,
};
use crate::atoms::error::{EngineError, EngineResult};
use crate::config::ServiceConfig;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

struct Connection {
    transport: StdioTransport,
    tools: Vec<RemoteToolDef>,
}

pub struct ServiceClient {
    config: ServiceConfig,
    /// `None` while disconnected. The mutex also serializes calls so a slow
    /// tool cannot interleave with the handshake of a reconnect.
    conn: Mutex<Option<Connection>>,
    next_id: AtomicU64,
}

impl ServiceClient {
    pub fn new(config: ServiceConfig) -> Self {
        ServiceClient { config, conn: Mutex::new(None), next_id: AtomicU64::new(1) }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    fn fresh_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Call a tool on this service. Connects first if needed.
    pub async fn call_tool(
        &self,
        tool: &str,
        arguments: serde_json::Value,
    ) -> EngineResult<String> {
        let mut guard = self.conn.lock().await;
        self.ensure_connected(&mut guard).await?;
        let transport = match guard.as_ref() {
            Some(c) => &c.transport,
            None => return Err(EngineError::service(&self.config.name, "not connected")),
        };

        let params = serde_json::to_value(ToolCallParams {
            name: tool.to_string(),
            arguments,
        })?;
        let request = JsonRpcRequest::new(self.fresh_id(), "tools/call", Some(params));

        let resp = match transport.send_request(request, self.config.call_timeout_secs).await {
            Ok(resp) => resp,
            Err(e) => {
                // The transport may be dead; drop it so the next call reconnects.
                warn!("[mcp] {}: tools/call failed: {}", self.config.name, e);
                if let Some(c) = guard.take() {
                    c.transport.shutdown().await;
                }
                return Err(e);
            }
        };

        if let Some(err) = resp.error {
            return Err(EngineError::service(&self.config.name, err.message));
        }
        let result: ToolCallResult = serde_json::from_value(
            resp.result
                .ok_or_else(|| EngineError::service(&self.config.name, "empty tools/call result"))?,
        )?;
        let text = extract_text(&result);
        if result.is_error {
            return Err(EngineError::service(&self.config.name, text));
        }
        Ok(text)
    }

    /// Bounded health probe. Connects if disconnected; a probe that cannot
    /// finish within the bound reports unhealthy rather than hanging.
    pub async fn health_check(&self) -> bool {
        let probe = async {
            let mut guard = self.conn.lock().await;
            if let Some(c) = guard.as_ref() {
                if c.transport.is_alive().await {
                    return true;
                }
                // Process died since last use.
                if let Some(c) = guard.take() {
                    c.transport.shutdown().await;
                }
            }
            self.ensure_connected(&mut guard).await.is_ok()
        };
        tokio::time::timeout(Duration::from_secs(HEALTH_PROBE_TIMEOUT_SECS), probe)
            .await
            .unwrap_or(false)
    }

    pub async fn status(&self) -> ServiceStatus {
        let guard = self.conn.lock().await;
        match guard.as_ref() {
            Some(c) => ServiceStatus {
                name: self.config.name.clone(),
                connected: true,
                tool_count: c.tools.len(),
                error: None,
            },
            None => ServiceStatus {
                name: self.config.name.clone(),
                connected: false,
                tool_count: 0,
                error: None,
            },
        }
    }

    /// Shut down the child process if running.
    pub async fn close(&self) {
        let mut guard = self.conn.lock().await;
        if let Some(c) = guard.take() {
            c.transport.shutdown().await;
        }
    }

    /// Spawn and handshake if there is no live connection behind the guard.
    async fn ensure_connected(
        &self,
        guard: &mut tokio::sync::MutexGuard<'_, Option<Connection>>,
    ) -> EngineResult<()> {
        if let Some(c) = guard.as_ref() {
            if c.transport.is_alive().await {
                return Ok(());
            }
            debug!("[mcp] {}: transport dead, reconnecting", self.config.name);
            if let Some(c) = guard.take() {
                c.transport.shutdown().await;
            }
        }

        let transport = StdioTransport::spawn(
            &self.config.name,
            &self.config.command,
            &self.config.args,
            &self.config.env,
        )
        .await?;

        // initialize handshake
        let params = serde_json::to_value(InitializeParams {
            protocol_version: MCP_PROTOCOL_VERSION.into(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo {
                name: "concierge".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
        })?;
        let init = JsonRpcRequest::new(self.fresh_id(), "initialize", Some(params));
        let resp = transport.send_request(init, MCP_HANDSHAKE_TIMEOUT_SECS).await?;
        if let Some(err) = resp.error {
            transport.shutdown().await;
            return Err(EngineError::service(
                &self.config.name,
                format!("initialize failed: {}", err.message),
            ));
        }
        if let Some(result) = resp.result {
            if let Ok(init) = serde_json::from_value::<InitializeResult>(result) {
                debug!(
                    "[mcp] {}: server protocol {}",
                    self.config.name, init.protocol_version
                );
            }
        }
        transport.send_notification("notifications/initialized", None).await?;

        // tools/list; a server without the tools capability is tolerated.
        let list = JsonRpcRequest::new(self.fresh_id(), "tools/list", None);
        let tools = match transport.send_request(list, MCP_HANDSHAKE_TIMEOUT_SECS).await {
            Ok(resp) => match (resp.result, resp.error) {
                (Some(result), _) => {
                    serde_json::from_value::<ToolsListResult>(result).map(|r| r.tools).unwrap_or_default()
                }
                (None, Some(err)) if err.code == METHOD_NOT_FOUND => Vec::new(),
                (None, Some(err)) => {
                    transport.shutdown().await;
                    return Err(EngineError::service(
                        &self.config.name,
                        format!("tools/list failed: {}", err.message),
                    ));
                }
                (None, None) => Vec::new(),
            },
            Err(e) => {
                transport.shutdown().await;
                return Err(e);
            }
        };

        info!("[mcp] {}: connected, {} tools", self.config.name, tools.len());
        **guard = Some(Connection { transport, tools });
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(command: &str) -> ServiceConfig {
        config_with_args(command, vec![])
    }

    fn config_with_args(command: &str, args: Vec<String>) -> ServiceConfig {
        ServiceConfig {
            name: "test".into(),
            command: command.into(),
            args,
            env: HashMap::new(),
            call_timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn test_call_on_unspawnable_command_errors() {
        let client = ServiceClient::new(config("/nonexistent/binary"));
        let err = client.call_tool("anything", serde_json::json!({})).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_health_check_is_bounded() {
        let client = ServiceClient::new(config("/nonexistent/binary"));
        let start = std::time::Instant::now();
        let healthy = client.health_check().await;
        assert!(!healthy);
        assert!(start.elapsed() < Duration::from_secs(HEALTH_PROBE_TIMEOUT_SECS + 1));
    }

    #[tokio::test]
    async fn test_health_check_bounded_when_handshake_hangs() {
        // The process spawns but never speaks JSON-RPC, so the initialize
        // request would wait out its own longer timeout. The probe bound
        // must cut it off first.
        let client = ServiceClient::new(config_with_args("sleep", vec!["30".into()]));
        let start = std::time::Instant::now();
        let healthy = client.health_check().await;
        assert!(!healthy);
        assert!(start.elapsed() < Duration::from_secs(HEALTH_PROBE_TIMEOUT_SECS + 1));
    }

    #[tokio::test]
    async fn test_status_starts_disconnected() {
        let client = ServiceClient::new(config("echo"));
        let status = client.status().await;
        assert!(!status.connected);
        assert_eq!(status.tool_count, 0);
    }
}
