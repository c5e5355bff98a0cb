// Concierge Engine — Anthropic Backend
// Messages API: x-api-key auth, anthropic-version header, SSE streaming via
// content_block_delta events. Model listing is a static catalog.

use super::{LlmBackend, TextStream};
use crate::atoms::constants::{CONNECT_PROBE_TIMEOUT_SECS, GENERATE_TIMEOUT_SECS};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{BackendKind, Generation};
use async_trait::async_trait;
use futures::StreamExt;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u64 = 4096;

/// Models offered through the API; there is no listing endpoint.
const KNOWN_MODELS: [&str; 3] =
    ["claude-3-5-sonnet-20241022", "claude-3-5-haiku-20241022", "claude-3-opus-20240229"];

pub struct AnthropicBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AnthropicBackend {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        AnthropicBackend {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(GENERATE_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Parse one SSE data payload; returns the text delta if present.
    fn parse_sse_event(data: &str) -> Option<String> {
        let v: Value = serde_json::from_str(data).ok()?;
        if v["type"].as_str()? != "content_block_delta" {
            return None;
        }
        let delta = &v["delta"];
        if delta["type"].as_str() == Some("text_delta") {
            delta["text"].as_str().map(|s| s.to_string())
        } else {
            None
        }
    }

    async fn post_messages(&self, body: &Value) -> EngineResult<reqwest::Response> {
        let url = format!("{}/v1/messages", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::backend(
                "anthropic",
                format!("API error {}: {}", status, text.chars().take(200).collect::<String>()),
            ));
        }
        Ok(resp)
    }

    fn request_body(prompt: &str, model: &str, system: Option<&str>, stream: bool) -> Value {
        let mut body = json!({
            "model": model,
            "max_tokens": MAX_TOKENS,
            "messages": [{"role": "user", "content": prompt}],
            "stream": stream,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        body
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Anthropic
    }

    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        system: Option<&str>,
    ) -> EngineResult<Generation> {
        debug!("[llm] Anthropic generate model={}", model);
        let body = Self::request_body(prompt, model, system, false);
        let resp = self.post_messages(&body).await?;
        let v: Value = resp.json().await?;
        let text = v["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|b| b["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        Ok(Generation {
            text,
            model: v["model"].as_str().unwrap_or(model).to_string(),
            eval_count: v["usage"]["output_tokens"].as_u64(),
        })
    }

    async fn generate_stream(&self, prompt: &str, model: &str) -> EngineResult<TextStream> {
        let body = Self::request_body(prompt, model, None, true);
        let resp = self.post_messages(&body).await?;

        let stream = async_stream::try_stream! {
            let mut byte_stream = resp.bytes_stream();
            let mut buffer = String::new();
            'read: while let Some(chunk) = byte_stream.next().await {
                let bytes = chunk.map_err(EngineError::Network)?;
                buffer.push_str(&String::from_utf8_lossy(&bytes));
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer = buffer[line_end + 1..].to_string();
                    if let Some(data) = line.strip_prefix("data: ") {
                        if let Ok(v) = serde_json::from_str::<Value>(data) {
                            if v["type"].as_str() == Some("message_stop") {
                                break 'read;
                            }
                        }
                        if let Some(text) = Self::parse_sse_event(data) {
                            if !text.is_empty() {
                                yield text;
                            }
                        }
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn check_connection(&self) -> bool {
        // No cheap health endpoint; a 1-token message doubles as the probe.
        let body = json!({
            "model": KNOWN_MODELS[1],
            "max_tokens": 1,
            "messages": [{"role": "user", "content": "ping"}],
        });
        let url = format!("{}/v1/messages", self.base_url);
        self.client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(Duration::from_secs(CONNECT_PROBE_TIMEOUT_SECS))
            .json(&body)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn list_models(&self) -> EngineResult<Vec<Value>> {
        Ok(KNOWN_MODELS.iter().map(|m| json!({"name": m})).collect())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
