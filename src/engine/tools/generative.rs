// Concierge Engine — Generative Tools
// Tools whose "execution" is one templated generation call: language drills,
// city guides, cooking, fitness, finance, and learning plans. Each template
// turns the invocation parameters into a tight instruction prompt.

use super::ToolContext;
use crate::atoms::types::ToolInvocation;
use std::sync::Arc;

pub const GENERATIVE_TOOLS: [&str; 17] = [
    "practice_kanji",
    "learn_vocabulary",
    "translate_text",
    "chess_openings",
    "word_games",
    "city_events",
    "city_restaurants",
    "recipe_search",
    "meal_plan",
    "cooking_tips",
    "workout_plan",
    "health_tracker",
    "budget_planner",
    "expense_analyzer",
    "finance_guide",
    "learning_plan",
    "study_techniques",
];

const SYSTEM: &str =
    "You are a concise assistant tool. Answer directly with the requested content only.";

pub async fn run(ctx: Arc<ToolContext>, invocation: ToolInvocation) -> Result<String, String> {
    // Only registered names reach here, so None means a required parameter
    // was absent from the invocation.
    let prompt = build_prompt(&invocation)
        .ok_or_else(|| format!("Missing required parameters for {}", invocation.name))?;
    let generation = ctx
        .backend
        .generate(&prompt, &ctx.model, Some(SYSTEM))
        .await
        .map_err(|e| e.to_string())?;
    let text = generation.text.trim().to_string();
    if text.is_empty() {
        return Err("Model returned an empty response".to_string());
    }
    Ok(text)
}

/// The instruction prompt for a generative tool, or None for unknown names.
fn build_prompt(invocation: &ToolInvocation) -> Option<String> {
    let p = |key: &str, default: &str| -> String {
        invocation
            .str_param(key)
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    };

    let prompt = match invocation.name.as_str() {
        "practice_kanji" => format!(
            "Give a short kanji practice session at JLPT level {}: 5 characters with \
             readings, meanings, and one example word each.",
            p("level", "N5")
        ),
        "learn_vocabulary" => format!(
            "Teach 8 useful {} vocabulary words about {}. For each: the word, \
             pronunciation, meaning, and a short example sentence.",
            p("language", "Japanese"),
            p("topic", "daily life")
        ),
        "translate_text" => format!(
            "Translate the following text to {}. Reply with the translation only.\n\n{}",
            p("target_language", "English"),
            invocation.str_param("text")?
        ),
        "chess_openings" => format!(
            "Explain the chess opening '{}': main line, key ideas, and one common trap.",
            p("opening", "Italian Game")
        ),
        "word_games" => format!(
            "Run one round of the word game '{}'. State the rules in one sentence, \
             then give the puzzle.",
            p("game", "word association")
        ),
        "city_events" => format!(
            "List notable cultural events and things to do in {} this week. \
             Use short bullets.",
            p("city", "Vienna")
        ),
        "city_restaurants" => format!(
            "Recommend 5 {} restaurants in {}. One line each: name, neighborhood, \
             signature dish.",
            p("cuisine", "well-regarded"),
            p("city", "Vienna")
        ),
        "recipe_search" => format!(
            "Suggest a recipe using: {}. Give ingredients and numbered steps, kept brief.",
            p("ingredients", invocation.str_param("dish").unwrap_or("what is on hand"))
        ),
        "meal_plan" => format!(
            "Create a {}-day {} meal plan. For each day: breakfast, lunch, dinner, \
             one line each.",
            p("days", "3"),
            p("diet", "balanced")
        ),
        "cooking_tips" => format!(
            "Give 5 practical cooking tips about {}.",
            p("topic", "everyday cooking")
        ),
        "workout_plan" => format!(
            "Create a {}-day workout plan for the goal: {}. Keep each day to 4 exercises \
             with sets and reps.",
            p("days", "3"),
            p("goal", "general fitness")
        ),
        "health_tracker" => format!(
            "Explain how to track {} effectively: what to record, how often, and \
             what trends to watch.",
            p("metric", "sleep and activity")
        ),
        "budget_planner" => format!(
            "Draft a simple monthly budget for an income of {}. Use percentage \
             categories and one sentence of guidance each.",
            p("income", "an average salary")
        ),
        "expense_analyzer" => format!(
            "Analyze these expenses and point out the top savings opportunities:\n{}",
            invocation.str_param("expenses")?
        ),
        "finance_guide" => format!(
            "Give a plain-language primer on {}. Cover the essentials in 5 short bullets.",
            p("topic", "personal finance basics")
        ),
        "learning_plan" => format!(
            "Create a 4-week learning plan for {}. One milestone per week with \
             concrete practice tasks.",
            invocation.str_param("subject")?
        ),
        "study_techniques" => format!(
            "Recommend 5 evidence-based study techniques for learning {}.",
            p("subject", "a new skill")
        ),
        _ => return None,
    };
    Some(prompt)
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_generative_tool_has_a_template() {
        for name in GENERATIVE_TOOLS {
            // Required-parameter tools get a value so the template resolves.
            let inv = ToolInvocation::new(
                name,
                json!({"text": "hola", "expenses": "rent 900", "subject": "rust"}),
            );
            assert!(build_prompt(&inv).is_some(), "tool '{}' has no template", name);
        }
    }

    #[test]
    fn test_parameters_flow_into_template() {
        let inv = ToolInvocation::new("city_events", json!({"city": "Graz"}));
        assert!(build_prompt(&inv).unwrap().contains("Graz"));

        let inv = ToolInvocation::new("translate_text", json!({"text": "hallo", "target_language": "French"}));
        let prompt = build_prompt(&inv).unwrap();
        assert!(prompt.contains("French"));
        assert!(prompt.contains("hallo"));
    }

    #[test]
    fn test_missing_required_parameter_yields_none() {
        let inv = ToolInvocation::bare("translate_text");
        assert!(build_prompt(&inv).is_none());
        let inv = ToolInvocation::bare("learning_plan");
        assert!(build_prompt(&inv).is_none());
    }

    #[test]
    fn test_unknown_name_yields_none() {
        assert!(build_prompt(&ToolInvocation::bare("mystery")).is_none());
    }
}
