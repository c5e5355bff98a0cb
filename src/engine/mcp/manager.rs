// Concierge Engine — Service Manager
//
// Owns the fixed roster of service clients and routes tool calls to them.
// Health checks fan out concurrently; each probe carries its own timeout so
// one hung service cannot stall the report.

use super::client::ServiceClient;
use super::types::ServiceStatus;
use crate::atoms::error::{EngineError, EngineResult};
use crate::config::ServiceConfig;
use futures::future::join_all;
use log::info;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct ServiceManager {
    clients: HashMap<String, Arc<ServiceClient>>,
}

impl ServiceManager {
    pub fn new(configs: Vec<ServiceConfig>) -> Self {
        let mut clients = HashMap::new();
        for config in configs {
            let name = config.name.clone();
            clients.insert(name, Arc::new(ServiceClient::new(config)));
        }
        info!("[mcp] Service roster: {:?}", clients.keys().collect::<Vec<_>>());
        ServiceManager { clients }
    }

    /// Call a tool on a named service. An unconfigured service is an error,
    /// surfaced to the user as an inline tool-error string upstream.
    pub async fn call(
        &self,
        service: &str,
        tool: &str,
        arguments: serde_json::Value,
    ) -> EngineResult<String> {
        let client = self
            .clients
            .get(service)
            .ok_or_else(|| EngineError::service(service, "service not configured"))?;
        client.call_tool(tool, arguments).await
    }

    pub fn is_configured(&self, service: &str) -> bool {
        self.clients.contains_key(service)
    }

    /// Probe every service concurrently. Each probe is independently bounded,
    /// so the whole fan-out finishes in roughly one probe timeout.
    pub async fn check_health(&self) -> HashMap<String, bool> {
        let probes = self.clients.values().map(|client| {
            let client = Arc::clone(client);
            async move { (client.name().to_string(), client.health_check().await) }
        });
        join_all(probes).await.into_iter().collect()
    }

    pub async fn statuses(&self) -> Vec<ServiceStatus> {
        let mut out = Vec::with_capacity(self.clients.len());
        for client in self.clients.values() {
            out.push(client.status().await);
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Shut down every service process.
    pub async fn close_all(&self) {
        for client in self.clients.values() {
            client.close().await;
        }
        info!("[mcp] All services closed");
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::constants::HEALTH_PROBE_TIMEOUT_SECS;
    use std::time::{Duration, Instant};

    fn config(name: &str, command: &str) -> ServiceConfig {
        config_with_args(name, command, vec![])
    }

    fn config_with_args(name: &str, command: &str, args: Vec<String>) -> ServiceConfig {
        ServiceConfig {
            name: name.into(),
            command: command.into(),
            args,
            env: HashMap::new(),
            call_timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn test_unconfigured_service_errors() {
        let manager = ServiceManager::new(vec![]);
        let err = manager.call("home", "get_weather", serde_json::json!({})).await;
        assert!(err.is_err());
        assert!(!manager.is_configured("home"));
    }

    #[tokio::test]
    async fn test_health_fanout_is_concurrent() {
        // Several unspawnable services: the fan-out should take about one
        // probe's worth of time, not the sum.
        let manager = ServiceManager::new(vec![
            config("a", "/nonexistent/a"),
            config("b", "/nonexistent/b"),
            config("c", "/nonexistent/c"),
        ]);
        let start = Instant::now();
        let health = manager.check_health().await;
        assert_eq!(health.len(), 3);
        assert!(health.values().all(|h| !h));
        assert!(start.elapsed() < Duration::from_secs(HEALTH_PROBE_TIMEOUT_SECS + 1));
    }

    #[tokio::test]
    async fn test_health_fanout_bounded_with_hanging_probe() {
        // `sleep` spawns fine but never answers the handshake, so its probe
        // can only end by hitting the probe timeout. The other probes must
        // still report, and the whole fan-out stays within one probe bound.
        let manager = ServiceManager::new(vec![
            config_with_args("hung", "sleep", vec!["30".into()]),
            config("dead", "/nonexistent/dead"),
        ]);
        let start = Instant::now();
        let health = manager.check_health().await;
        assert_eq!(health.get("hung"), Some(&false));
        assert_eq!(health.get("dead"), Some(&false));
        assert!(start.elapsed() < Duration::from_secs(HEALTH_PROBE_TIMEOUT_SECS + 1));
    }

    #[tokio::test]
    async fn test_statuses_sorted_and_disconnected() {
        let manager = ServiceManager::new(vec![config("b", "echo"), config("a", "echo")]);
        let statuses = manager.statuses().await;
        assert_eq!(statuses[0].name, "a");
        assert_eq!(statuses[1].name, "b");
        assert!(statuses.iter().all(|s| !s.connected));
    }
}
