// Concierge Engine — Prompt Enhancement
//
// Two-step pipeline: classify the prompt (one JSON generation call with a
// heuristic fallback), pick a rewrite strategy, then rewrite. Enhancement is
// advisory only: any failure, an empty rewrite, or a bloated rewrite falls
// back to the user's original words.

use crate::atoms::constants::ENHANCEMENT_MAX_GROWTH;
use crate::atoms::types::{Complexity, Intent, IntentAnalysis, Strategy};
use crate::engine::llm::AnyBackend;
use log::debug;

pub struct Enhancer {
    backend: AnyBackend,
    model: String,
}

impl Enhancer {
    pub fn new(backend: AnyBackend, model: impl Into<String>) -> Self {
        Enhancer { backend, model: model.into() }
    }

    /// Rewrite a prompt. Returns `None` when the original should be used,
    /// for any reason. This function never errors.
    pub async fn enhance(&self, prompt: &str) -> Option<String> {
        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            return None;
        }

        let analysis = self.analyze_intent(trimmed).await;
        let strategy = select_strategy(&analysis, self.backend.kind().is_metered());
        debug!(
            "[enhance] intent={:?} domain={} complexity={:?} -> {:?}",
            analysis.intent, analysis.domain, analysis.complexity, strategy
        );

        let meta_prompt = rewrite_prompt(strategy, trimmed);
        let rewritten = match self.backend.generate(&meta_prompt, &self.model, None).await {
            Ok(generation) => generation.text,
            Err(e) => {
                debug!("[enhance] rewrite call failed, keeping original: {}", e);
                return None;
            }
        };

        accept_rewrite(trimmed, &rewritten)
    }

    /// One classification call; any failure degrades to the heuristic.
    async fn analyze_intent(&self, prompt: &str) -> IntentAnalysis {
        let classify = format!(
            "Classify the following user prompt. Reply with only a JSON object with keys \
             \"intent\" (QUESTION, INSTRUCTION, CREATIVE, ANALYSIS, CONVERSATION, or TECHNICAL), \
             \"domain\" (one lowercase word), \
             \"complexity\" (SIMPLE, MODERATE, or COMPLEX), and \
             \"expertise\" (BASIC, INTERMEDIATE, or EXPERT).\n\nPrompt: {}",
            prompt
        );
        match self.backend.generate(&classify, &self.model, None).await {
            Ok(generation) => parse_analysis(&generation.text)
                .unwrap_or_else(|| IntentAnalysis::fallback(prompt)),
            Err(e) => {
                debug!("[enhance] classification call failed: {}", e);
                IntentAnalysis::fallback(prompt)
            }
        }
    }
}

/// Find and parse the first JSON object in a model response.
fn parse_analysis(response: &str) -> Option<IntentAnalysis> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

/// Cost-aware strategy table. Metered backends always get the cheapest
/// rewrite; the richer templates are reserved for local generation.
pub fn select_strategy(analysis: &IntentAnalysis, metered: bool) -> Strategy {
    if metered {
        return Strategy::Instructional;
    }
    let complex_reasoning = analysis.complexity == Complexity::Complex
        && matches!(analysis.intent, Intent::Question | Intent::Technical);
    if complex_reasoning {
        return Strategy::ChainOfThought;
    }
    if analysis.intent == Intent::Creative || matches!(analysis.domain.as_str(), "writing" | "art")
    {
        return Strategy::FewShot;
    }
    Strategy::Instructional
}

/// The meta-prompt asking the model to rewrite the user's prompt.
fn rewrite_prompt(strategy: Strategy, prompt: &str) -> String {
    match strategy {
        Strategy::Instructional => format!(
            "Rewrite the following prompt to be clearer and more specific, keeping the \
             user's intent and language. Reply with the rewritten prompt only.\n\n\
             Prompt: {}",
            prompt
        ),
        Strategy::FewShot => format!(
            "Rewrite the following prompt so it asks for concrete examples and a defined \
             style. Reply with the rewritten prompt only.\n\n\
             Example: \"write a poem\" becomes \"Write a short free-verse poem about an \
             everyday moment, using vivid sensory detail.\"\n\
             Example: \"draw ideas\" becomes \"Suggest three illustration concepts with \
             subject, mood, and color palette for each.\"\n\n\
             Prompt: {}",
            prompt
        ),
        Strategy::ChainOfThought => format!(
            "Rewrite the following prompt so the answer will reason step by step before \
             concluding. Keep the user's question intact and append an instruction to \
             show the reasoning. Reply with the rewritten prompt only.\n\n\
             Prompt: {}",
            prompt
        ),
    }
}

/// Sanity guard: reject empty rewrites and rewrites that ballooned.
fn accept_rewrite(original: &str, rewritten: &str) -> Option<String> {
    let cleaned = rewritten.trim().trim_matches('"').trim();
    if cleaned.is_empty() || cleaned == original {
        return None;
    }
    if cleaned.chars().count() > original.chars().count() * ENHANCEMENT_MAX_GROWTH {
        debug!("[enhance] rewrite grew past the length guard, keeping original");
        return None;
    }
    Some(cleaned.to_string())
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::Expertise;

    fn analysis(intent: Intent, domain: &str, complexity: Complexity) -> IntentAnalysis {
        IntentAnalysis {
            intent,
            domain: domain.into(),
            complexity,
            expertise: Expertise::Basic,
        }
    }

    #[test]
    fn test_metered_always_instructional() {
        // Even the strongest chain-of-thought candidate stays cheap on a
        // metered backend.
        let a = analysis(Intent::Technical, "engineering", Complexity::Complex);
        assert_eq!(select_strategy(&a, true), Strategy::Instructional);
        let a = analysis(Intent::Creative, "writing", Complexity::Simple);
        assert_eq!(select_strategy(&a, true), Strategy::Instructional);
    }

    #[test]
    fn test_local_complex_reasoning_gets_chain_of_thought() {
        let a = analysis(Intent::Question, "science", Complexity::Complex);
        assert_eq!(select_strategy(&a, false), Strategy::ChainOfThought);
        let a = analysis(Intent::Technical, "engineering", Complexity::Complex);
        assert_eq!(select_strategy(&a, false), Strategy::ChainOfThought);
    }

    #[test]
    fn test_local_creative_gets_few_shot() {
        let a = analysis(Intent::Creative, "general", Complexity::Simple);
        assert_eq!(select_strategy(&a, false), Strategy::FewShot);
        let a = analysis(Intent::Instruction, "writing", Complexity::Moderate);
        assert_eq!(select_strategy(&a, false), Strategy::FewShot);
        let a = analysis(Intent::Instruction, "art", Complexity::Moderate);
        assert_eq!(select_strategy(&a, false), Strategy::FewShot);
    }

    #[test]
    fn test_local_default_is_instructional() {
        let a = analysis(Intent::Conversation, "general", Complexity::Simple);
        assert_eq!(select_strategy(&a, false), Strategy::Instructional);
        let a = analysis(Intent::Analysis, "finance", Complexity::Moderate);
        assert_eq!(select_strategy(&a, false), Strategy::Instructional);
        // Complex but creative intent does not trigger chain-of-thought.
        let a = analysis(Intent::Creative, "general", Complexity::Complex);
        assert_eq!(select_strategy(&a, false), Strategy::FewShot);
    }

    #[test]
    fn test_parse_analysis_extracts_embedded_json() {
        let response = r#"Sure! Here is the classification:
            {"intent":"QUESTION","domain":"science","complexity":"COMPLEX","expertise":"EXPERT"}
            Hope that helps."#;
        let a = parse_analysis(response).unwrap();
        assert_eq!(a.intent, Intent::Question);
        assert_eq!(a.domain, "science");
        assert_eq!(a.complexity, Complexity::Complex);
    }

    #[test]
    fn test_parse_analysis_accepts_every_intent_label() {
        // ANALYSIS and CONVERSATION replies must parse rather than silently
        // degrading to the heuristic fallback.
        for label in ["ANALYSIS", "CONVERSATION", "CREATIVE", "INSTRUCTION"] {
            let response = format!(
                r#"{{"intent":"{}","domain":"general","complexity":"SIMPLE","expertise":"BASIC"}}"#,
                label
            );
            assert!(parse_analysis(&response).is_some(), "label {} did not parse", label);
        }
    }

    #[test]
    fn test_parse_analysis_garbage_is_none() {
        assert!(parse_analysis("no json here").is_none());
        assert!(parse_analysis("{broken").is_none());
        assert!(parse_analysis(r#"{"intent":"SHOUTING"}"#).is_none());
    }

    #[test]
    fn test_accept_rewrite_guards() {
        // Empty and identical rewrites are rejected.
        assert!(accept_rewrite("tell me a story", "").is_none());
        assert!(accept_rewrite("tell me a story", "   ").is_none());
        assert!(accept_rewrite("tell me a story", "tell me a story").is_none());

        // A rewrite past 3x the original length is rejected.
        let original = "short prompt";
        let bloated = "x".repeat(original.len() * ENHANCEMENT_MAX_GROWTH + 1);
        assert!(accept_rewrite(original, &bloated).is_none());

        // A reasonable rewrite passes, with wrapping quotes stripped.
        let ok = accept_rewrite("tell me a story", "\"Tell a short story.\"").unwrap();
        assert_eq!(ok, "Tell a short story.");
    }
}
