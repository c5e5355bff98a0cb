// Concierge Engine — OpenAI Backend
// Chat-completions API: blocking and SSE-streaming generation, Bearer auth.

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

pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiBackend {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        OpenAiBackend {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(GENERATE_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn messages_body(prompt: &str, system: Option<&str>) -> Vec<Value> {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt}));
        messages
    }

    /// Parse one SSE data payload; returns the text delta if present.
    fn parse_sse_chunk(data: &str) -> Option<String> {
        if data == "[DONE]" {
            return None;
        }
        let v: Value = serde_json::from_str(data).ok()?;
        v["choices"].get(0)?["delta"]["content"].as_str().map(|s| s.to_string())
    }

    async fn post_completions(&self, body: &Value) -> EngineResult<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::backend(
                "openai",
                format!("API error {}: {}", status, truncate(&text, 200)),
            ));
        }
        Ok(resp)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::OpenAi
    }

    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        system: Option<&str>,
    ) -> EngineResult<Generation> {
        let body = json!({
            "model": model,
            "messages": Self::messages_body(prompt, system),
            "stream": false,
        });
        debug!("[llm] OpenAI generate model={}", model);
        let resp = self.post_completions(&body).await?;
        let v: Value = resp.json().await?;
        let text = v["choices"][0]["message"]["content"].as_str().unwrap_or_default().to_string();
        Ok(Generation {
            text,
            model: v["model"].as_str().unwrap_or(model).to_string(),
            eval_count: v["usage"]["completion_tokens"].as_u64(),
        })
    }

    async fn generate_stream(&self, prompt: &str, model: &str) -> EngineResult<TextStream> {
        let body = json!({
            "model": model,
            "messages": Self::messages_body(prompt, None),
            "stream": true,
        });
        let resp = self.post_completions(&body).await?;

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
                        if data == "[DONE]" {
                            break 'read;
                        }
                        if let Some(text) = Self::parse_sse_chunk(data) {
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
        let url = format!("{}/models", self.base_url);
        self.client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(Duration::from_secs(CONNECT_PROBE_TIMEOUT_SECS))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn list_models(&self) -> EngineResult<Vec<Value>> {
        let url = format!("{}/models", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(EngineError::backend(
                "openai",
                format!("models failed ({})", resp.status().as_u16()),
            ));
        }
        let body: Value = resp.json().await?;
        Ok(body["data"].as_array().cloned().unwrap_or_default())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sse_chunk_text_delta() {
        let data = r#"{"choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(OpenAiBackend::parse_sse_chunk(data), Some("Hello".to_string()));
    }

    #[test]
    fn test_parse_sse_chunk_done_and_empty_delta() {
        assert_eq!(OpenAiBackend::parse_sse_chunk("[DONE]"), None);
        let data = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(OpenAiBackend::parse_sse_chunk(data), None);
    }

    #[test]
    fn test_messages_body_includes_system_first() {
        let msgs = OpenAiBackend::messages_body("hi", Some("be terse"));
        assert_eq!(msgs[0]["role"], "system");
        assert_eq!(msgs[1]["role"], "user");
        let msgs = OpenAiBackend::messages_body("hi", None);
        assert_eq!(msgs.len(), 1);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("ab", 10), "ab");
    }
}
