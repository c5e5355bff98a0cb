// Concierge Engine — Ollama Backend
// Local model runtime. Blocking and NDJSON-streaming generation, plus the
// management surface (tags, pull, delete, ps) that backs the LLM routes.

use super::{LlmBackend, TextStream};
use crate::atoms::constants::{CONNECT_PROBE_TIMEOUT_SECS, GENERATE_TIMEOUT_SECS};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{BackendKind, Generation};
use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, info, warn};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

pub struct OllamaBackend {
    client: Client,
    base_url: String,
}

impl OllamaBackend {
    pub fn new(base_url: &str) -> Self {
        OllamaBackend {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(CONNECT_PROBE_TIMEOUT_SECS))
                .timeout(Duration::from_secs(GENERATE_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Download a model. Blocks until the pull completes or fails.
    pub async fn pull_model(&self, name: &str) -> EngineResult<()> {
        info!("[llm] Pulling model '{}'", name);
        let resp = self
            .client
            .post(self.url("/api/pull"))
            .timeout(Duration::from_secs(3600))
            .json(&json!({"name": name, "stream": false}))
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::backend("ollama", format!("pull failed ({}): {}", status, body)));
        }
        Ok(())
    }

    /// Remove a local model.
    pub async fn delete_model(&self, name: &str) -> EngineResult<()> {
        info!("[llm] Deleting model '{}'", name);
        let resp = self
            .client
            .delete(self.url("/api/delete"))
            .json(&json!({"name": name}))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(EngineError::backend(
                "ollama",
                format!("delete failed ({})", resp.status().as_u16()),
            ));
        }
        Ok(())
    }

    /// Models currently loaded into memory.
    pub async fn running_models(&self) -> EngineResult<Vec<Value>> {
        let resp = self.client.get(self.url("/api/ps")).send().await?;
        let body: Value = resp.json().await?;
        Ok(body["models"].as_array().cloned().unwrap_or_default())
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Ollama
    }

    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        system: Option<&str>,
    ) -> EngineResult<Generation> {
        let mut body = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }

        debug!("[llm] Ollama generate model={} prompt_len={}", model, prompt.len());
        let resp = self.client.post(self.url("/api/generate")).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::backend("ollama", format!("generate failed ({}): {}", status, text)));
        }

        let v: Value = resp.json().await?;
        Ok(Generation {
            text: v["response"].as_str().unwrap_or_default().to_string(),
            model: v["model"].as_str().unwrap_or(model).to_string(),
            eval_count: v["eval_count"].as_u64(),
        })
    }

    async fn generate_stream(&self, prompt: &str, model: &str) -> EngineResult<TextStream> {
        let body = json!({
            "model": model,
            "prompt": prompt,
            "stream": true,
        });

        let resp = self.client.post(self.url("/api/generate")).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::backend("ollama", format!("generate failed ({}): {}", status, text)));
        }

        // NDJSON: one JSON object per line, `done: true` on the last.
        let stream = async_stream::try_stream! {
            let mut byte_stream = resp.bytes_stream();
            let mut buffer = String::new();
            'read: while let Some(chunk) = byte_stream.next().await {
                let bytes = chunk.map_err(EngineError::Network)?;
                buffer.push_str(&String::from_utf8_lossy(&bytes));
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer = buffer[line_end + 1..].to_string();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Value>(&line) {
                        Ok(v) => {
                            if let Some(text) = v["response"].as_str() {
                                if !text.is_empty() {
                                    yield text.to_string();
                                }
                            }
                            if v["done"].as_bool() == Some(true) {
                                break 'read;
                            }
                        }
                        Err(e) => warn!("[llm] Ollama stream: bad NDJSON line: {}", e),
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn check_connection(&self) -> bool {
        self.client
            .get(self.url("/api/tags"))
            .timeout(Duration::from_secs(CONNECT_PROBE_TIMEOUT_SECS))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn list_models(&self) -> EngineResult<Vec<Value>> {
        let resp = self.client.get(self.url("/api/tags")).send().await?;
        if !resp.status().is_success() {
            return Err(EngineError::backend(
                "ollama",
                format!("tags failed ({})", resp.status().as_u16()),
            ));
        }
        let body: Value = resp.json().await?;
        Ok(body["models"].as_array().cloned().unwrap_or_default())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let backend = OllamaBackend::new("http://localhost:11434/");
        assert_eq!(backend.url("/api/tags"), "http://localhost:11434/api/tags");
    }

    #[tokio::test]
    async fn test_check_connection_unreachable_is_false() {
        // Port 9 (discard) is not an Ollama server.
        let backend = OllamaBackend::new("http://127.0.0.1:9");
        assert!(!backend.check_connection().await);
    }
}
