// Concierge Engine — MCP Stdio Transport
//
// Spawns a service process and speaks JSON-RPC over its stdin/stdout using
// Content-Length framed messages (the same framing as LSP). Responses are
// routed back to callers through a pending map keyed by request id.

use super::types::{JsonRpcRequest, JsonRpcResponse};
use crate::atoms::error::{EngineError, EngineResult};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Mutex};

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// A running stdio transport. Owns the child process and message routing.
pub struct StdioTransport {
    writer_tx: mpsc::Sender<Vec<u8>>,
    pending: PendingMap,
    child: Arc<Mutex<Option<Child>>>,
    _reader_handle: tokio::task::JoinHandle<()>,
    _writer_handle: tokio::task::JoinHandle<()>,
}

impl StdioTransport {
    /// Spawn the service process and wire up both directions.
    pub async fn spawn(
        service: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> EngineResult<Self> {
        info!("[mcp] Spawning service '{}': {} {}", service, command, args.join(" "));

        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());
        for (k, v) in env {
            cmd.env(k, v);
        }

        let mut child = cmd.spawn().map_err(|e| {
            EngineError::service(service, format!("failed to spawn `{}`: {}", command, e))
        })?;

        let stdin = child.stdin.take().ok_or_else(|| EngineError::service(service, "no stdin"))?;
        let stdout =
            child.stdout.take().ok_or_else(|| EngineError::service(service, "no stdout"))?;
        let stderr =
            child.stderr.take().ok_or_else(|| EngineError::service(service, "no stderr"))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        // Writer task: frames outgoing messages onto stdin.
        let (writer_tx, mut writer_rx) = mpsc::channel::<Vec<u8>>(64);
        let _writer_handle = {
            let mut stdin = stdin;
            tokio::spawn(async move {
                while let Some(body) = writer_rx.recv().await {
                    let header = format!("Content-Length: {}\r\n\r\n", body.len());
                    if stdin.write_all(header.as_bytes()).await.is_err()
                        || stdin.write_all(&body).await.is_err()
                        || stdin.flush().await.is_err()
                    {
                        error!("[mcp] stdin write failed, stopping writer");
                        break;
                    }
                }
                debug!("[mcp] Writer task exiting");
            })
        };

        // Reader task: routes framed responses back to pending callers.
        let _reader_handle = {
            let pending = Arc::clone(&pending);
            let service = service.to_string();
            let mut reader = BufReader::new(stdout);
            tokio::spawn(async move {
                loop {
                    match read_message(&mut reader).await {
                        Ok(Some(data)) => match serde_json::from_slice::<JsonRpcResponse>(&data) {
                            Ok(resp) => {
                                if let Some(id) = resp.id {
                                    let mut map = pending.lock().await;
                                    if let Some(tx) = map.remove(&id) {
                                        let _ = tx.send(resp);
                                    } else {
                                        debug!("[mcp] {}: response for unknown id={}", service, id);
                                    }
                                } else {
                                    // Server-initiated notification, not awaited by anyone.
                                    debug!("[mcp] {}: notification received", service);
                                }
                            }
                            Err(e) => warn!("[mcp] {}: unparseable response: {}", service, e),
                        },
                        Ok(None) => {
                            info!("[mcp] {}: stdout closed (server exited)", service);
                            break;
                        }
                        Err(e) => {
                            error!("[mcp] {}: read error: {}", service, e);
                            break;
                        }
                    }
                }
                // Wake up anyone still waiting so they error instead of hanging.
                pending.lock().await.clear();
            })
        };

        // Stderr drain, logged at debug so noisy servers stay quiet.
        {
            let service = service.to_string();
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr);
                let mut line = String::new();
                loop {
                    line.clear();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            let trimmed = line.trim();
                            if !trimmed.is_empty() {
                                debug!("[mcp:{}:stderr] {}", service, trimmed);
                            }
                        }
                    }
                }
            });
        }

        Ok(StdioTransport {
            writer_tx,
            pending,
            child: Arc::new(Mutex::new(Some(child))),
            _reader_handle,
            _writer_handle,
        })
    }

    /// Send a request and wait for its response, bounded by `timeout_secs`.
    pub async fn send_request(
        &self,
        request: JsonRpcRequest,
        timeout_secs: u64,
    ) -> EngineResult<JsonRpcResponse> {
        let id = request.id;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let body = serde_json::to_vec(&request)?;
        if self.writer_tx.send(body).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(EngineError::Other("transport writer closed".into()));
        }

        match tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), rx).await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(_)) => Err(EngineError::Other("response channel dropped".into())),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(EngineError::Timeout(timeout_secs))
            }
        }
    }

    /// Send a notification (no response expected).
    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> EngineResult<()> {
        let notif = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params.unwrap_or(serde_json::json!({})),
        });
        let body = serde_json::to_vec(&notif)?;
        self.writer_tx
            .send(body)
            .await
            .map_err(|_| EngineError::Other("transport writer closed".into()))
    }

    /// Kill the child process and clean up.
    pub async fn shutdown(&self) {
        let mut guard = self.child.lock().await;
        if let Some(ref mut child) = *guard {
            info!("[mcp] Killing service process");
            let _ = child.kill().await;
        }
        *guard = None;
    }

    /// True while the child process is still running.
    pub async fn is_alive(&self) -> bool {
        let mut guard = self.child.lock().await;
        match guard.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        // Best-effort kill; the async shutdown path is preferred.
        let child = self.child.clone();
        tokio::spawn(async move {
            let mut guard = child.lock().await;
            if let Some(ref mut child) = *guard {
                let _ = child.kill().await;
            }
        });
    }
}

// ── Content-Length framed reader ───────────────────────────────────────────

/// Read one framed message. Returns `Ok(None)` on clean EOF.
async fn read_message<R: tokio::io::AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> EngineResult<Option<Vec<u8>>> {
    let mut content_length: Option<usize> = None;
    let mut header_line = String::new();

    loop {
        header_line.clear();
        let n = reader.read_line(&mut header_line).await?;
        if n == 0 {
            return Ok(None);
        }
        let trimmed = header_line.trim();
        if trimmed.is_empty() {
            break;
        }
        if let Some(val) = trimmed.strip_prefix("Content-Length:") {
            content_length = val.trim().parse::<usize>().ok();
        }
        // Other headers (Content-Type etc.) are ignored.
    }

    let len = content_length
        .ok_or_else(|| EngineError::Other("missing Content-Length header".into()))?;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_message_basic() {
        let data = b"Content-Length: 13\r\n\r\n{\"test\":true}";
        let mut reader = BufReader::new(&data[..]);
        let msg = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(msg, b"{\"test\":true}");
    }

    #[tokio::test]
    async fn test_read_message_eof() {
        let data = b"";
        let mut reader = BufReader::new(&data[..]);
        assert!(read_message(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_message_skips_extra_headers() {
        let data = b"Content-Length: 2\r\nContent-Type: application/json\r\n\r\n{}";
        let mut reader = BufReader::new(&data[..]);
        let msg = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(msg, b"{}");
    }

    #[tokio::test]
    async fn test_read_message_missing_length_is_error() {
        let data = b"Content-Type: application/json\r\n\r\n{}";
        let mut reader = BufReader::new(&data[..]);
        assert!(read_message(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn test_two_messages_back_to_back() {
        let data = b"Content-Length: 2\r\n\r\n{}Content-Length: 4\r\n\r\nnull";
        let mut reader = BufReader::new(&data[..]);
        assert_eq!(read_message(&mut reader).await.unwrap().unwrap(), b"{}");
        assert_eq!(read_message(&mut reader).await.unwrap().unwrap(), b"null");
    }
}
