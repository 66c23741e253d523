//! Turns a natural-language query into a validated [`Plan`]
//!
//! The LLM proposes steps; every step is checked against the registry before
//! a plan is returned, so the executor only ever sees known tools with their
//! required parameters present and correctly typed.

use super::error::PlanningError;
use super::prompt::{planner_system_prompt, planner_user_prompt};
use super::types::{Plan, PlanStep};
use crate::llm::{complete_json, LLMClient};
use crate::tools::{ParamViolation, ToolRegistry};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Plan document as returned by the model, before validation
#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    steps: Option<Vec<Value>>,
    #[serde(default)]
    expected_output: Option<Value>,
}

/// Function names used by older prompt formats, mapped to tool names
const FUNCTION_ALIASES: &[(&str, &str)] = &[
    ("get_current_weather", "weather"),
    ("get_weather_by_coordinates", "weather_coordinates"),
    ("search_news", "news_search"),
    ("get_top_headlines", "news_headlines"),
    ("get_random_joke", "jokes"),
    ("search_jokes", "jokes_search"),
];

pub struct Planner {
    llm: Arc<dyn LLMClient>,
    registry: Arc<ToolRegistry>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LLMClient>, registry: Arc<ToolRegistry>) -> Self {
        Self { llm, registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub async fn plan(&self, query: &str) -> Result<Plan, PlanningError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PlanningError::EmptyQuery);
        }
        self.plan_for(query, query).await
    }

    /// Plans the query again with extra context appended
    ///
    /// The returned plan keeps the original query text; its steps are numbered
    /// from zero and must be appended to the existing plan by the caller.
    pub async fn refine(&self, plan: &Plan, feedback: &str) -> Result<Plan, PlanningError> {
        let prompt_query = format!("{}\n\nAdditional context: {}", plan.query(), feedback);
        self.plan_for(plan.query(), &prompt_query).await
    }

    async fn plan_for(&self, query: &str, prompt_query: &str) -> Result<Plan, PlanningError> {
        let start = Instant::now();
        info!(client = self.llm.name(), "Planning query");

        let system_prompt = planner_system_prompt(&self.registry);
        let user_prompt = planner_user_prompt(prompt_query);
        debug!(prompt_len = system_prompt.len() + user_prompt.len(), "Planner prompt built");

        let raw: RawPlan =
            complete_json(self.llm.as_ref(), &system_prompt, &user_prompt, "plan").await?;
        let plan = self.validate(query, raw)?;

        info!(
            steps = plan.len(),
            tools = ?plan.tool_names(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Plan validated"
        );
        Ok(plan)
    }

    fn validate(&self, query: &str, raw: RawPlan) -> Result<Plan, PlanningError> {
        let raw_steps = raw.steps.ok_or(PlanningError::MissingSteps)?;
        if raw_steps.is_empty() {
            return Err(PlanningError::EmptyPlan);
        }

        let steps = raw_steps
            .iter()
            .enumerate()
            .map(|(step_index, raw_step)| self.validate_step(step_index, raw_step))
            .collect::<Result<Vec<_>, _>>()?;

        let expected_output = match raw.expected_output {
            Some(Value::String(text)) => Some(text),
            Some(other) => {
                debug!(expected_output = %other, "Ignoring non-string expected_output");
                None
            }
            None => None,
        };

        Ok(Plan::new(query, steps, expected_output))
    }

    fn validate_step(&self, step_index: usize, raw: &Value) -> Result<PlanStep, PlanningError> {
        let fields = raw
            .as_object()
            .ok_or(PlanningError::MalformedStep { step_index })?;

        let tool_name = self.resolve_tool(fields).ok_or_else(|| {
            let requested = fields
                .get("tool")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            PlanningError::UnknownTool {
                step_index,
                tool: requested,
                available: self.registry.tool_names().join(", "),
            }
        })?;

        let spec = self
            .registry
            .get_spec(&tool_name)
            .ok_or_else(|| PlanningError::UnknownTool {
                step_index,
                tool: tool_name.clone(),
                available: self.registry.tool_names().join(", "),
            })?;

        let params = match fields.get("parameters") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };

        let checked = spec.check(&params).map_err(|violation| match violation {
            ParamViolation::Missing { param } => PlanningError::MissingParameter {
                step_index,
                tool: tool_name.clone(),
                param,
            },
            invalid @ ParamViolation::Invalid { .. } => PlanningError::InvalidParameter {
                step_index,
                tool: tool_name.clone(),
                reason: invalid.to_string(),
            },
        })?;

        if !checked.dropped.is_empty() {
            debug!(
                step_index,
                tool = %tool_name,
                dropped = ?checked.dropped,
                "Dropped unknown parameters"
            );
        }

        let action = fields
            .get("action")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Run {}", tool_name));

        Ok(PlanStep {
            step_index,
            tool_name,
            parameters: checked.params,
            action,
        })
    }

    /// Registered tool for a raw step, by `function` alias first, then `tool`
    fn resolve_tool(&self, fields: &Map<String, Value>) -> Option<String> {
        let by_function = fields
            .get("function")
            .and_then(Value::as_str)
            .and_then(|f| {
                let f = f.trim().to_lowercase();
                FUNCTION_ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == f)
                    .map(|(_, tool)| *tool)
            })
            .and_then(|tool| self.registry.resolve(tool));

        by_function
            .or_else(|| {
                fields
                    .get("tool")
                    .and_then(Value::as_str)
                    .and_then(|t| self.registry.resolve(t))
            })
            .map(str::to_string)
    }
}

impl std::fmt::Debug for Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planner")
            .field("llm", &self.llm.name())
            .field("tools", &self.registry.tool_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AiopsConfig;
    use crate::llm::{LlmError, MockLLMClient, MockResponse};
    use serde_json::json;

    fn planner_with(responses: Vec<MockResponse>) -> (Planner, Arc<MockLLMClient>) {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_responses(responses);
        let registry = Arc::new(ToolRegistry::with_defaults(&AiopsConfig::default()));
        (Planner::new(mock.clone(), registry), mock)
    }

    #[tokio::test]
    async fn test_plan_joke_and_weather() {
        let (planner, _) = planner_with(vec![MockResponse::json(json!({
            "task": "weather of noida and a joke about dreams",
            "steps": [
                {"tool": "weather", "action": "Get weather for Noida", "parameters": {"city": "Noida"}},
                {"tool": "jokes_search", "action": "Find a joke about dreams", "parameters": {"query": "dreams"}}
            ],
            "expected_output": "Weather and a joke"
        }))]);

        let plan = planner
            .plan("weather of noida and a joke about dreams")
            .await
            .unwrap();

        assert_eq!(plan.tool_names(), vec!["weather", "jokes_search"]);
        assert_eq!(plan.step(0).unwrap().parameters["city"], "Noida");
        assert_eq!(plan.step(1).unwrap().step_index, 1);
        assert_eq!(plan.expected_output(), Some("Weather and a joke"));
    }

    #[tokio::test]
    async fn test_plan_ignores_llm_step_ids_and_defaults_action() {
        let (planner, _) = planner_with(vec![MockResponse::text(
            "```json\n{\"steps\": [{\"step_id\": 7, \"tool\": \"JOKES\", \"parameters\": {}}]}\n```",
        )]);

        let plan = planner.plan("Tell me a random joke.").await.unwrap();
        let step = plan.step(0).unwrap();

        assert_eq!(step.step_index, 0);
        assert_eq!(step.tool_name, "jokes");
        assert_eq!(step.action, "Run jokes");
    }

    #[tokio::test]
    async fn test_plan_maps_function_alias() {
        let (planner, _) = planner_with(vec![MockResponse::json(json!({
            "steps": [{"tool": "jokes", "function": "search_jokes", "parameters": {"query": "cats"}}]
        }))]);

        let plan = planner.plan("joke about cats").await.unwrap();
        assert_eq!(plan.tool_names(), vec!["jokes_search"]);
    }

    #[tokio::test]
    async fn test_plan_coerces_and_drops_params() {
        let (planner, _) = planner_with(vec![MockResponse::json(json!({
            "steps": [{
                "tool": "news_search",
                "parameters": {"query": "rust", "limit": "3", "mood": "happy"}
            }]
        }))]);

        let plan = planner.plan("3 rust news").await.unwrap();
        let params = &plan.step(0).unwrap().parameters;

        assert_eq!(params["limit"], 3);
        assert!(params.get("mood").is_none());
    }

    #[tokio::test]
    async fn test_plan_rejects_unknown_tool() {
        let (planner, _) = planner_with(vec![MockResponse::json(json!({
            "steps": [
                {"tool": "weather", "parameters": {"city": "Paris"}},
                {"tool": "stocks", "parameters": {"symbol": "AAPL"}}
            ]
        }))]);

        let err = planner.plan("weather and stocks").await.unwrap_err();
        match err {
            PlanningError::UnknownTool {
                step_index, tool, ..
            } => {
                assert_eq!(step_index, 1);
                assert_eq!(tool, "stocks");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_plan_rejects_missing_and_blank_params() {
        let (planner, _) = planner_with(vec![
            MockResponse::json(json!({"steps": [{"tool": "weather", "parameters": {}}]})),
            MockResponse::json(json!({"steps": [{"tool": "weather", "parameters": {"city": "  "}}]})),
        ]);

        for _ in 0..2 {
            let err = planner.plan("weather").await.unwrap_err();
            assert!(
                matches!(err, PlanningError::MissingParameter { ref param, .. } if param == "city"),
                "unexpected error: {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_plan_rejects_uncoercible_param() {
        let (planner, _) = planner_with(vec![MockResponse::json(json!({
            "steps": [{"tool": "weather_coordinates", "parameters": {"lat": "north", "lon": 2.0}}]
        }))]);

        let err = planner.plan("weather at north").await.unwrap_err();
        assert!(matches!(err, PlanningError::InvalidParameter { .. }));
    }

    #[tokio::test]
    async fn test_plan_shape_errors() {
        let (planner, _) = planner_with(vec![
            MockResponse::json(json!({"task": "nothing"})),
            MockResponse::json(json!({"steps": []})),
            MockResponse::text("I think you want the weather"),
        ]);

        assert!(matches!(
            planner.plan("a").await,
            Err(PlanningError::MissingSteps)
        ));
        assert!(matches!(
            planner.plan("b").await,
            Err(PlanningError::EmptyPlan)
        ));
        assert!(matches!(
            planner.plan("c").await,
            Err(PlanningError::Llm(LlmError::InvalidJson { .. }))
        ));
    }

    #[tokio::test]
    async fn test_plan_tolerates_structured_expected_output() {
        let (planner, _) = planner_with(vec![MockResponse::json(json!({
            "steps": [{"tool": "jokes", "parameters": {}}],
            "expected_output": {"format": "a joke"}
        }))]);

        let plan = planner.plan("Tell me a random joke.").await.unwrap();

        assert_eq!(plan.tool_names(), vec!["jokes"]);
        assert_eq!(plan.expected_output(), None);
    }

    #[tokio::test]
    async fn test_plan_rejects_non_object_step() {
        let (planner, _) = planner_with(vec![MockResponse::json(json!({
            "steps": [{"tool": "jokes", "parameters": {}}, "then the weather"]
        }))]);

        let err = planner.plan("joke and weather").await.unwrap_err();
        assert!(matches!(err, PlanningError::MalformedStep { step_index: 1 }));
        assert_eq!(err.to_string(), "Step 1 is not a JSON object");
    }

    #[tokio::test]
    async fn test_plan_rejects_blank_query_without_llm_call() {
        let (planner, mock) = planner_with(vec![]);
        assert!(matches!(
            planner.plan("   ").await,
            Err(PlanningError::EmptyQuery)
        ));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_plan_propagates_llm_timeout() {
        let (planner, _) = planner_with(vec![MockResponse::error(LlmError::TimeoutError {
            seconds: 30,
        })]);

        assert!(matches!(
            planner.plan("weather").await,
            Err(PlanningError::Llm(LlmError::TimeoutError { seconds: 30 }))
        ));
    }

    #[tokio::test]
    async fn test_refine_appends_context_and_keeps_query() {
        let (planner, mock) = planner_with(vec![
            MockResponse::json(json!({"steps": [{"tool": "jokes", "parameters": {}}]})),
            MockResponse::json(json!({"steps": [{"tool": "news_headlines", "parameters": {}}]})),
        ]);

        let plan = planner.plan("joke and headlines").await.unwrap();
        let refined = planner.refine(&plan, "top headlines").await.unwrap();

        assert_eq!(refined.query(), "joke and headlines");
        assert_eq!(refined.tool_names(), vec!["news_headlines"]);

        let requests = mock.requests();
        let user_prompt = requests[1].user_prompt().unwrap_or_default();
        assert!(user_prompt.contains("joke and headlines\n\nAdditional context: top headlines"));
    }
}
