// Concierge Engine — Tool Catalog
// The static, read-only description of every tool the engine can run.
// Served verbatim by the tools route and used for display; dispatch itself
// lives in the registry.

use crate::atoms::types::ToolDescriptor;
use std::collections::BTreeMap;

fn tool(name: &str, description: &str, params: &[(&str, &str)]) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: description.to_string(),
        parameters: params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// The full catalog, in display order.
pub fn catalog() -> Vec<ToolDescriptor> {
    vec![
        // Pure / local
        tool("calculator", "Evaluate an arithmetic expression", &[("expression", "expression to evaluate")]),
        tool("datetime", "Current date and time", &[]),
        tool("get_todos", "List open todo items", &[]),
        tool("get_calendar", "List upcoming calendar events", &[]),
        // Network
        tool("web_search", "Search the web for an instant answer", &[("query", "search query")]),
        tool("transit", "Next public transit departures", &[("stop", "stop name (optional)")]),
        tool("transit_route", "Plan a public transit route", &[("from", "origin"), ("to", "destination")]),
        // Knowledge base
        tool("search_knowledge", "Search notes in the knowledge base", &[("query", "search query")]),
        tool("read_note", "Read a note by title", &[("title", "note title")]),
        tool("create_note", "Create a new note", &[("content", "note content"), ("title", "note title (optional)")]),
        tool("recent_notes", "Recently modified notes", &[]),
        tool("edit_note", "Append to or edit a note", &[("title", "note title"), ("content", "new content")]),
        tool("link_notes", "Link two notes together", &[("from", "source note"), ("to", "target note")]),
        tool("create_daily_note", "Create today's daily note", &[]),
        tool("search_by_tag", "Find notes carrying a tag", &[("tag", "tag name")]),
        tool("create_project", "Create a project note structure", &[("name", "project name")]),
        tool("list_projects", "List project notes", &[]),
        // Home
        tool("get_weather", "Current weather and forecast", &[]),
        tool("control_lights", "Turn lights on or off", &[("state", "on or off"), ("room", "room name (optional)")]),
        tool("list_lights", "List known lights and their state", &[]),
        tool("camera_status", "Status of the home cameras", &[]),
        tool("doorbell_events", "Recent doorbell events", &[]),
        // Games
        tool("play_chess", "Make a chess move against the engine", &[("move", "move in algebraic notation")]),
        tool("analyze_position", "Analyze a chess position", &[("fen", "position in FEN")]),
        tool("play_go", "Make a go move against the engine", &[("move", "move in coordinates")]),
        // Language learning
        tool("practice_kanji", "Kanji practice session", &[("level", "JLPT level (optional)")]),
        tool("learn_vocabulary", "Vocabulary drill", &[("language", "language (optional)"), ("topic", "topic (optional)")]),
        tool("translate_text", "Translate text", &[("text", "text to translate"), ("target_language", "target language (optional)")]),
        // Games content
        tool("chess_openings", "Explain a chess opening", &[("opening", "opening name (optional)")]),
        tool("word_games", "Play a word game", &[("game", "game name (optional)")]),
        // City guides
        tool("city_events", "Events and things to do in a city", &[("city", "city (optional)")]),
        tool("city_restaurants", "Restaurant recommendations", &[("city", "city (optional)"), ("cuisine", "cuisine (optional)")]),
        // Cooking
        tool("recipe_search", "Find a recipe", &[("ingredients", "available ingredients (optional)"), ("dish", "dish name (optional)")]),
        tool("meal_plan", "Multi-day meal plan", &[("days", "number of days (optional)"), ("diet", "dietary style (optional)")]),
        tool("cooking_tips", "Practical cooking tips", &[("topic", "topic (optional)")]),
        // Fitness
        tool("workout_plan", "Workout plan for a goal", &[("goal", "training goal (optional)"), ("days", "days per week (optional)")]),
        tool("health_tracker", "How to track a health metric", &[("metric", "metric (optional)")]),
        // Finance
        tool("budget_planner", "Draft a monthly budget", &[("income", "monthly income (optional)")]),
        tool("expense_analyzer", "Analyze a list of expenses", &[("expenses", "expense list")]),
        tool("finance_guide", "Personal finance primer", &[("topic", "topic (optional)")]),
        // Learning
        tool("learning_plan", "Four-week learning plan", &[("subject", "subject to learn")]),
        tool("study_techniques", "Study technique recommendations", &[("subject", "subject (optional)")]),
    ]
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = catalog().into_iter().map(|t| t.name).collect();
        assert_eq!(names.len(), catalog().len());
    }

    #[test]
    fn test_descriptions_nonempty() {
        for t in catalog() {
            assert!(!t.description.is_empty(), "tool '{}' has no description", t.name);
        }
    }
}
