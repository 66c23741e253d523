//! Deterministic text rendering used by the verifier
//!
//! Nothing here calls the LLM: these texts are produced when every step
//! failed, when failed steps must be listed under an answer, and when the
//! verifier LLM is unavailable and fallback formatting is enabled.

use super::types::{ExecutionResult, FailedStep, FinalAnswer, StepResult};
use serde_json::Value;

const MAX_ARTICLES: usize = 5;
const MAX_JOKES: usize = 5;
const DESCRIPTION_PREVIEW: usize = 150;

pub fn failed_steps(result: &ExecutionResult) -> Vec<FailedStep> {
    result.failed().map(FailedStep::from).collect()
}

/// Answer for an execution in which no step succeeded
pub fn all_failed_answer(query: &str, result: &ExecutionResult) -> FinalAnswer {
    let failed = failed_steps(result);

    let mut text = format!("I was unable to complete your request: \"{}\"\n\n", query);
    if failed.is_empty() {
        text.push_str("No results were obtained because the plan produced no steps.\n");
    } else {
        text.push_str("All execution steps failed with the following errors:\n");
        for step in &failed {
            text.push_str(&format!(
                "- Step {} ({}): {}\n",
                step.step_index + 1,
                step.tool,
                step.error
            ));
        }
    }
    text.push_str(
        "\n**Suggestions:**\n\
         - Check that all required API keys are configured in your .env file\n\
         - Verify your internet connection\n\
         - Try simplifying your query\n\
         - Check if the requested resources exist (e.g., valid city names)",
    );

    FinalAnswer {
        text,
        supporting_data: Vec::new(),
        complete: false,
        missing_info: vec!["All requested information due to execution failures".to_string()],
        suggestions: vec![
            "Verify API keys are configured".to_string(),
            "Check internet connection".to_string(),
            "Try a simpler query".to_string(),
        ],
        failed_steps: failed,
    }
}

/// Section appended to an answer listing steps that produced no data
///
/// Empty when nothing failed.
pub fn failure_note(failed: &[FailedStep]) -> String {
    if failed.is_empty() {
        return String::new();
    }
    let mut note = String::from("\n\n**Note:** Some information could not be retrieved:");
    for step in failed {
        note.push_str(&format!("\n- {} ({}): {}", step.action, step.tool, step.error));
    }
    note
}

/// Plain rendering of every successful payload, in step order
pub fn render_results(query: &str, result: &ExecutionResult) -> String {
    let mut out = format!("**Results for:** {}\n", query);
    for step in result.successful() {
        out.push_str(&format!("\n**{} Results:**\n", step.tool_name.to_uppercase()));
        out.push_str(&render_step(step));
    }
    out
}

fn render_step(step: &StepResult) -> String {
    let payload = match &step.payload {
        Some(payload) => payload,
        None => return String::new(),
    };
    match step.tool_name.as_str() {
        "weather" | "weather_coordinates" => render_weather(payload),
        "news_search" | "news_headlines" => render_news(payload),
        "jokes" | "jokes_search" => render_jokes(payload),
        _ => serde_json::to_string_pretty(payload).unwrap_or_default() + "\n",
    }
}

fn render_weather(payload: &Value) -> String {
    let location = &payload["location"];
    let city = location["city"].as_str().unwrap_or("Unknown");
    let mut out = match location["country"].as_str() {
        Some(country) => format!("**{}, {}**\n", city, country),
        None => format!("**{}**\n", city),
    };

    if let Some(description) = payload["weather"]["description"].as_str() {
        out.push_str(&format!("- Conditions: {}\n", title_case(description)));
    }
    let current = &payload["temperature"]["current"];
    if let (Some(c), Some(f)) = (current["celsius"].as_f64(), current["fahrenheit"].as_f64()) {
        out.push_str(&format!("- Temperature: {}°C / {}°F\n", c, f));
    }
    if let Some(humidity) = payload["humidity"].as_f64() {
        out.push_str(&format!("- Humidity: {}%\n", humidity));
    }
    if let Some(speed) = payload["wind"]["speed_ms"].as_f64() {
        out.push_str(&format!("- Wind: {} m/s\n", speed));
    }
    out
}

fn render_news(payload: &Value) -> String {
    let articles = match payload["articles"].as_array() {
        Some(articles) if !articles.is_empty() => articles,
        _ => return "- No articles found\n".to_string(),
    };

    let mut out = String::new();
    for article in articles.iter().take(MAX_ARTICLES) {
        out.push_str(&format!(
            "- **{}**\n",
            article["title"].as_str().unwrap_or("Untitled")
        ));
        let source = article["source"].as_str().unwrap_or("Unknown");
        let date: String = article["published_at"]
            .as_str()
            .unwrap_or("")
            .chars()
            .take(10)
            .collect();
        out.push_str(&format!("  Source: {} | {}\n", source, date));
        if let Some(description) = article["description"].as_str() {
            let preview: String = description.chars().take(DESCRIPTION_PREVIEW).collect();
            out.push_str(&format!("  {}...\n", preview));
        }
    }
    out
}

fn render_jokes(payload: &Value) -> String {
    if let Some(joke) = payload["joke"].as_str() {
        return format!("- {}\n", joke);
    }
    match payload["jokes"].as_array() {
        Some(jokes) if !jokes.is_empty() => jokes
            .iter()
            .take(MAX_JOKES)
            .filter_map(|j| j["joke"].as_str())
            .map(|j| format!("- {}\n", j))
            .collect(),
        _ => "- No jokes found\n".to_string(),
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::PlanStep;
    use crate::tools::ToolError;
    use serde_json::{json, Map};
    use std::time::Duration;

    fn step(index: usize, tool: &str, action: &str) -> PlanStep {
        PlanStep {
            step_index: index,
            tool_name: tool.to_string(),
            parameters: Map::new(),
            action: action.to_string(),
        }
    }

    fn weather_payload() -> Value {
        json!({
            "location": {"city": "Noida", "country": "IN"},
            "weather": {"description": "haze"},
            "temperature": {"current": {"celsius": 28.6, "fahrenheit": 83.5}},
            "humidity": 61,
            "wind": {"speed_ms": 3.1}
        })
    }

    #[test]
    fn test_all_failed_answer_lists_every_step() {
        let result = ExecutionResult::new(vec![
            StepResult::failure(
                &step(0, "weather", "Get weather"),
                ToolError::authentication("OPENWEATHER_API_KEY is not configured"),
                1,
                Duration::ZERO,
            ),
            StepResult::failure(
                &step(1, "jokes", "Get a joke"),
                ToolError::timeout("request timed out"),
                3,
                Duration::ZERO,
            ),
        ]);

        let answer = all_failed_answer("weather and a joke", &result);

        assert!(!answer.complete);
        assert!(answer.supporting_data.is_empty());
        assert_eq!(answer.failed_steps.len(), 2);
        assert!(answer.text.contains("\"weather and a joke\""));
        assert!(answer.text.contains("- Step 1 (weather): authentication: OPENWEATHER_API_KEY"));
        assert!(answer.text.contains("- Step 2 (jokes): timeout: request timed out"));
        assert!(answer.text.contains("API keys"));
    }

    #[test]
    fn test_all_failed_answer_for_empty_result() {
        let answer = all_failed_answer("anything", &ExecutionResult::new(vec![]));
        assert!(answer.text.contains("No results were obtained"));
        assert!(answer.failed_steps.is_empty());
    }

    #[test]
    fn test_failure_note() {
        assert_eq!(failure_note(&[]), "");

        let note = failure_note(&[FailedStep {
            step_index: 0,
            tool: "weather".to_string(),
            action: "Get weather for Noida".to_string(),
            error: "timeout: slow".to_string(),
        }]);
        assert!(note.starts_with("\n\n**Note:**"));
        assert!(note.contains("- Get weather for Noida (weather): timeout: slow"));
    }

    #[test]
    fn test_render_results_per_tool() {
        let result = ExecutionResult::new(vec![
            StepResult::success(
                &step(0, "weather", "Get weather"),
                weather_payload(),
                1,
                Duration::ZERO,
            ),
            StepResult::success(
                &step(1, "jokes_search", "Find a joke"),
                json!({"type": "search", "jokes": [{"joke": "I dream of sleep"}]}),
                1,
                Duration::ZERO,
            ),
            StepResult::failure(
                &step(2, "news_search", "Get news"),
                ToolError::timeout("slow"),
                3,
                Duration::ZERO,
            ),
        ]);

        let text = render_results("weather and joke", &result);

        assert!(text.starts_with("**Results for:** weather and joke"));
        assert!(text.contains("**WEATHER Results:**"));
        assert!(text.contains("**Noida, IN**"));
        assert!(text.contains("- Conditions: Haze"));
        assert!(text.contains("- Temperature: 28.6°C / 83.5°F"));
        assert!(text.contains("- Humidity: 61%"));
        assert!(text.contains("- Wind: 3.1 m/s"));
        assert!(text.contains("- I dream of sleep"));
        assert!(!text.contains("NEWS_SEARCH"));
    }

    #[test]
    fn test_render_news_truncates() {
        let articles: Vec<Value> = (0..8)
            .map(|i| {
                json!({
                    "title": format!("Story {}", i),
                    "source": "Wire",
                    "published_at": "2025-03-04T05:06:07Z",
                    "description": "x".repeat(300),
                })
            })
            .collect();
        let text = render_news(&json!({"articles": articles}));

        assert_eq!(text.matches("- **Story").count(), MAX_ARTICLES);
        assert!(text.contains("Source: Wire | 2025-03-04\n"));
        assert!(text.contains(&format!("  {}...", "x".repeat(150))));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("scattered clouds"), "Scattered Clouds");
        assert_eq!(title_case(""), "");
    }
}
