// Concierge Engine — Chat Orchestrator
//
// One turn of the assistant, as a lazy event stream:
//   at most one `enhancement`, then a `tool` event per executed tool, then
//   `text` chunks, then exactly one `done`. The generator is driven by the
//   consumer, so dropping the stream cancels the in-flight generation.

use crate::atoms::types::{ChatEvent, ChatMessage, ChatRequest, Personality, Role};
use crate::engine::enhance::Enhancer;
use crate::engine::intent::IntentDetector;
use crate::engine::llm::AnyBackend;
use crate::engine::tools::ToolRegistry;
use futures::{Stream, StreamExt};
use log::{info, warn};
use std::sync::Arc;

pub struct ChatEngine {
    backend: AnyBackend,
    registry: Arc<ToolRegistry>,
    detector: Arc<dyn IntentDetector>,
    enhancer: Enhancer,
    default_model: String,
}

impl ChatEngine {
    pub fn new(
        backend: AnyBackend,
        registry: Arc<ToolRegistry>,
        detector: Arc<dyn IntentDetector>,
        default_model: impl Into<String>,
    ) -> Self {
        let default_model = default_model.into();
        let enhancer = Enhancer::new(backend.clone(), default_model.clone());
        ChatEngine { backend, registry, detector, enhancer, default_model }
    }

    /// Run one chat turn. The stream upholds the event contract even when
    /// every collaborator fails.
    pub fn stream(self: Arc<Self>, request: ChatRequest) -> impl Stream<Item = ChatEvent> + Send {
        async_stream::stream! {
            let engine = self;
            let model = request
                .model
                .clone()
                .unwrap_or_else(|| engine.default_model.clone());
            let personality = find_personality(request.personality.as_deref());
            let conversation = request
                .conversation_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            info!(
                "[chat] Turn start: conversation={} model={} personality={} tools={} enhance={}",
                conversation, model, personality.id, request.use_tools, request.enhance_prompts
            );

            let mut messages = request.messages.clone();
            let last_is_user =
                matches!(messages.last(), Some(m) if m.role == Role::User);
            let mut user_text = match messages.last() {
                Some(m) if m.role == Role::User => m.content.clone(),
                _ => String::new(),
            };

            // 1. Prompt enhancement, gated on request and a trailing user turn.
            // An accepted rewrite replaces the user text for everything that
            // follows, detection included.
            if request.enhance_prompts && last_is_user {
                if let Some(enhanced) = engine.enhancer.enhance(&user_text).await {
                    yield ChatEvent::Enhancement {
                        original: user_text.clone(),
                        enhanced: enhanced.clone(),
                    };
                    if let Some(last) = messages.last_mut() {
                        last.content = enhanced.clone();
                    }
                    user_text = enhanced;
                }
            }

            // 2. Tool detection and execution, sequential, before generation.
            let mut tool_results: Vec<(String, String)> = Vec::new();
            if request.use_tools && last_is_user {
                for invocation in engine.detector.detect(&user_text) {
                    let result = engine.registry.execute(&invocation).await;
                    yield ChatEvent::Tool {
                        tool: invocation.name.clone(),
                        result: result.clone(),
                    };
                    tool_results.push((invocation.name, result));
                }
            }

            // 3. Flatten the conversation and generate.
            let prompt = assemble_prompt(&personality, &messages, &tool_results);
            match engine.backend.generate_stream(&prompt, &model).await {
                Ok(mut chunks) => {
                    while let Some(chunk) = chunks.next().await {
                        match chunk {
                            Ok(text) => yield ChatEvent::Text { content: text },
                            Err(e) => {
                                warn!("[chat] Stream broke mid-generation: {}", e);
                                yield ChatEvent::Text {
                                    content: format!("\n[generation interrupted: {}]", e),
                                };
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    // The turn still completes coherently: inline error, then done.
                    warn!("[chat] Generation failed: {}", e);
                    yield ChatEvent::Text {
                        content: format!("I could not reach the language model: {}", e),
                    };
                }
            }

            yield ChatEvent::Done;
        }
    }
}

// ── Prompt assembly ────────────────────────────────────────────────────────

/// Flatten system prompt, history, and tool results into one completion
/// prompt: `ROLE: content` paragraphs ending in a bare `ASSISTANT: `.
fn assemble_prompt(
    personality: &Personality,
    messages: &[ChatMessage],
    tool_results: &[(String, String)],
) -> String {
    let mut parts = vec![format!("SYSTEM: {}", personality.system_prompt)];

    for (i, message) in messages.iter().enumerate() {
        let mut content = message.content.clone();
        let is_last = i + 1 == messages.len();
        if is_last && message.role == Role::User && !tool_results.is_empty() {
            let block: Vec<String> =
                tool_results.iter().map(|(name, result)| format!("- {}: {}", name, result)).collect();
            content = format!("{}\n\nTool Results:\n{}", content, block.join("\n"));
        }
        parts.push(format!("{}: {}", message.role.label(), content));
    }

    format!("{}\n\nASSISTANT: ", parts.join("\n\n"))
}

// ── Personalities ──────────────────────────────────────────────────────────

fn personality(id: &str, name: &str, description: &str, system_prompt: &str) -> Personality {
    Personality {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        system_prompt: system_prompt.into(),
    }
}

/// The selectable personas. `assistant` is the fallback for unknown ids.
pub fn personalities() -> Vec<Personality> {
    vec![
        personality(
            "assistant",
            "Assistant",
            "Balanced, helpful default",
            "You are a helpful personal assistant. Be accurate, warm, and direct. \
             When tool results are provided, ground your answer in them.",
        ),
        personality(
            "creative",
            "Creative",
            "Imaginative and playful",
            "You are a creative companion. Favor vivid language, surprising angles, \
             and concrete imagery. When tool results are provided, weave them in naturally.",
        ),
        personality(
            "technical",
            "Technical",
            "Precise and detailed",
            "You are a precise technical assistant. Prefer exact terminology, show \
             reasoning when useful, and cite tool results verbatim where relevant.",
        ),
        personality(
            "friendly",
            "Friendly",
            "Casual and encouraging",
            "You are a friendly companion. Keep the tone light and encouraging, like \
             a thoughtful friend. Use tool results to be genuinely useful.",
        ),
        personality(
            "concise",
            "Concise",
            "Short answers only",
            "You answer in as few words as accuracy allows. No preamble, no filler. \
             If tool results answer the question, restate them briefly.",
        ),
        personality(
            "vienna",
            "Vienna",
            "Local guide with Viennese charm",
            "You are a Viennese local guide: knowledgeable about the city's districts, \
             cafes, transit, and culture, with dry Viennese humor. Answer practical \
             questions precisely and add one local tip when it fits.",
        ),
    ]
}

/// Look up a personality by id; unknown or absent ids fall back to `assistant`.
pub fn find_personality(id: Option<&str>) -> Personality {
    let all = personalities();
    let wanted = id.unwrap_or("assistant");
    all.iter()
        .find(|p| p.id == wanted)
        .cloned()
        .unwrap_or_else(|| all[0].clone())
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::error::EngineResult;
    use crate::atoms::types::{BackendKind, Generation};
    use crate::engine::intent::KeywordDetector;
    use crate::engine::llm::{LlmBackend, TextStream};
    use crate::engine::mcp::ServiceManager;
    use crate::engine::records::InMemoryRecordStore;
    use crate::engine::tools::ToolContext;
    use async_trait::async_trait;

    struct MockBackend {
        reply: String,
    }

    #[async_trait]
    impl LlmBackend for MockBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Ollama
        }

        async fn generate(
            &self,
            _prompt: &str,
            model: &str,
            _system: Option<&str>,
        ) -> EngineResult<Generation> {
            Ok(Generation { text: self.reply.clone(), model: model.into(), eval_count: None })
        }

        async fn generate_stream(&self, _prompt: &str, _model: &str) -> EngineResult<TextStream> {
            let words: Vec<String> = self.reply.split(' ').map(|w| format!("{} ", w)).collect();
            let chunks = words.into_iter().map(Ok::<_, crate::atoms::error::EngineError>);
            Ok(Box::pin(futures::stream::iter(chunks)))
        }

        async fn check_connection(&self) -> bool {
            true
        }

        async fn list_models(&self) -> EngineResult<Vec<serde_json::Value>> {
            Ok(vec![])
        }
    }

    fn engine_with_reply(reply: &str) -> Arc<ChatEngine> {
        let backend = AnyBackend::from_impl(Arc::new(MockBackend { reply: reply.into() }));
        let ctx = Arc::new(ToolContext {
            backend: backend.clone(),
            services: Arc::new(ServiceManager::new(vec![])),
            records: Arc::new(InMemoryRecordStore::new()),
            http: reqwest::Client::new(),
            transit_api_url: None,
            model: "test-model".into(),
        });
        let registry = Arc::new(ToolRegistry::new(ctx));
        Arc::new(ChatEngine::new(
            backend,
            registry,
            Arc::new(KeywordDetector::new()),
            "test-model",
        ))
    }

    fn request(message: &str, use_tools: bool, enhance: bool) -> ChatRequest {
        ChatRequest {
            conversation_id: None,
            messages: vec![ChatMessage::user(message)],
            model: None,
            personality: None,
            use_tools,
            enhance_prompts: enhance,
        }
    }

    async fn collect(engine: Arc<ChatEngine>, req: ChatRequest) -> Vec<ChatEvent> {
        engine.stream(req).collect::<Vec<_>>().await
    }

    #[tokio::test]
    async fn test_math_question_runs_calculator_then_answers() {
        let engine = engine_with_reply("The answer is 96.");
        let events = collect(engine, request("What is 12 * 8?", true, false)).await;

        // First event is the calculator tool with the computed result.
        match &events[0] {
            ChatEvent::Tool { tool, result } => {
                assert_eq!(tool, "calculator");
                assert!(result.contains("96"), "result was: {}", result);
            }
            other => panic!("expected tool event first, got {:?}", other),
        }
        // Some text follows, and the stream ends with exactly one done.
        assert!(events.iter().any(|e| matches!(e, ChatEvent::Text { .. })));
        assert_eq!(events.last(), Some(&ChatEvent::Done));
        assert_eq!(events.iter().filter(|e| matches!(e, ChatEvent::Done)).count(), 1);
    }

    #[tokio::test]
    async fn test_greeting_skips_tools() {
        let engine = engine_with_reply("Hi there!");
        let events = collect(engine, request("Hello, how are you?", true, false)).await;
        assert!(!events.iter().any(|e| matches!(e, ChatEvent::Tool { .. })));
        assert!(!events.iter().any(|e| matches!(e, ChatEvent::Enhancement { .. })));
        assert_eq!(events.last(), Some(&ChatEvent::Done));
    }

    #[tokio::test]
    async fn test_use_tools_false_suppresses_tool_events() {
        let engine = engine_with_reply("It is 96.");
        let events = collect(engine, request("What is 12 * 8?", false, false)).await;
        assert!(!events.iter().any(|e| matches!(e, ChatEvent::Tool { .. })));
    }

    #[tokio::test]
    async fn test_enhancement_event_comes_first_and_is_single() {
        // Reply is under the 3x length guard relative to "write a poem".
        let engine = engine_with_reply("Write a short autumn poem.");
        let events = collect(engine, request("write a poem", false, true)).await;
        match &events[0] {
            ChatEvent::Enhancement { original, enhanced } => {
                assert_eq!(original, "write a poem");
                assert_ne!(enhanced, original);
            }
            other => panic!("expected enhancement first, got {:?}", other),
        }
        let count =
            events.iter().filter(|e| matches!(e, ChatEvent::Enhancement { .. })).count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_detection_runs_on_the_enhanced_text() {
        // The mock answers every call with the same text, so the rewrite
        // becomes "What is 6 * 7?". The original message carries no cue;
        // the calculator can only fire if detection reads the rewrite.
        let engine = engine_with_reply("What is 6 * 7?");
        let events = collect(engine, request("please do the math", true, true)).await;

        assert!(matches!(&events[0], ChatEvent::Enhancement { .. }));
        let tool = events.iter().find_map(|e| match e {
            ChatEvent::Tool { tool, result } => Some((tool.as_str(), result.as_str())),
            _ => None,
        });
        let (tool, result) = tool.expect("calculator should fire on the rewritten text");
        assert_eq!(tool, "calculator");
        assert!(result.contains("42"), "result was: {}", result);
    }

    #[tokio::test]
    async fn test_no_enhancement_when_last_turn_is_assistant() {
        let engine = engine_with_reply("Continuing.");
        let req = ChatRequest {
            conversation_id: None,
            messages: vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")],
            model: None,
            personality: None,
            use_tools: true,
            enhance_prompts: true,
        };
        let events = collect(engine, req).await;
        assert!(!events.iter().any(|e| matches!(e, ChatEvent::Enhancement { .. })));
        assert!(!events.iter().any(|e| matches!(e, ChatEvent::Tool { .. })));
        assert_eq!(events.last(), Some(&ChatEvent::Done));
    }

    #[tokio::test]
    async fn test_empty_message_list_still_completes() {
        let engine = engine_with_reply("Hello.");
        let req = ChatRequest {
            conversation_id: None,
            messages: vec![],
            model: None,
            personality: None,
            use_tools: true,
            enhance_prompts: true,
        };
        let events = collect(engine, req).await;
        assert_eq!(events.last(), Some(&ChatEvent::Done));
        assert_eq!(events.iter().filter(|e| matches!(e, ChatEvent::Done)).count(), 1);
    }

    #[test]
    fn test_assemble_prompt_shape() {
        let p = find_personality(Some("concise"));
        let messages = vec![
            ChatMessage::user("first question"),
            ChatMessage::assistant("first answer"),
            ChatMessage::user("what is 2+2?"),
        ];
        let results = vec![("calculator".to_string(), "2+2 = 4".to_string())];
        let prompt = assemble_prompt(&p, &messages, &results);

        assert!(prompt.starts_with("SYSTEM: "));
        assert!(prompt.contains("USER: first question"));
        assert!(prompt.contains("ASSISTANT: first answer"));
        assert!(prompt.contains("Tool Results:\n- calculator: 2+2 = 4"));
        assert!(prompt.ends_with("\n\nASSISTANT: "));

        // The tool block attaches to the final user turn only.
        let idx_block = prompt.find("Tool Results:").unwrap();
        let idx_last_user = prompt.find("USER: what is 2+2?").unwrap();
        assert!(idx_block > idx_last_user);
    }

    #[test]
    fn test_assemble_prompt_carries_tool_role_history() {
        let p = find_personality(None);
        let messages = vec![
            ChatMessage::user("lights?"),
            ChatMessage { role: Role::Tool, content: "Lights turned on".into() },
            ChatMessage::user("thanks, and the weather?"),
        ];
        let prompt = assemble_prompt(&p, &messages, &[]);
        assert!(prompt.contains("TOOL: Lights turned on"));
    }

    #[test]
    fn test_assemble_prompt_without_tools_has_no_block() {
        let p = find_personality(None);
        let messages = vec![ChatMessage::user("hello")];
        let prompt = assemble_prompt(&p, &messages, &[]);
        assert!(!prompt.contains("Tool Results:"));
    }

    #[test]
    fn test_unknown_personality_falls_back_to_assistant() {
        assert_eq!(find_personality(Some("pirate")).id, "assistant");
        assert_eq!(find_personality(None).id, "assistant");
        assert_eq!(find_personality(Some("vienna")).id, "vienna");
    }
}
