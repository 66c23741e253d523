//! icanhazdadjoke tools: a random joke (`jokes`) and keyword search
//! (`jokes_search`). The service needs no credentials.

use super::error::{PermanentKind, ToolError};
use super::http::ApiClient;
use super::spec::{ParamSpec, ParamType, ToolSpec};
use super::trait_def::Tool;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

const DEFAULT_LIMIT: i64 = 5;
const MAX_LIMIT: i64 = 30;

pub fn normalize_random_joke(raw: &Value) -> Result<Value, ToolError> {
    let joke = raw["joke"]
        .as_str()
        .ok_or_else(|| ToolError::invalid_response("joke service returned no joke"))?;
    Ok(json!({
        "type": "random",
        "joke": joke,
        "id": raw["id"],
    }))
}

pub fn normalize_joke_search(raw: &Value, term: &str, limit: usize) -> Result<Value, ToolError> {
    let results = raw["results"]
        .as_array()
        .ok_or_else(|| ToolError::invalid_response("joke search returned no results list"))?;

    let jokes: Vec<Value> = results
        .iter()
        .take(limit)
        .map(|item| json!({"joke": item["joke"], "id": item["id"]}))
        .collect();

    Ok(json!({
        "type": "search",
        "query": term,
        "total_results": raw["total_results"].as_u64().unwrap_or(jokes.len() as u64),
        "returned_count": jokes.len(),
        "jokes": jokes,
    }))
}

pub struct RandomJokeTool {
    api: Arc<ApiClient>,
    spec: ToolSpec,
}

impl RandomJokeTool {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            spec: ToolSpec::new("jokes", "Get a random dad joke"),
        }
    }
}

#[async_trait]
impl Tool for RandomJokeTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn invoke(&self, params: &Map<String, Value>) -> Result<Value, ToolError> {
        self.spec.check(params)?;
        info!("Getting random dad joke");

        // Random jokes bypass the cache
        let raw = self
            .api
            .get_json_uncached("", &BTreeMap::new(), None)
            .await?;
        normalize_random_joke(&raw)
    }
}

pub struct JokeSearchTool {
    api: Arc<ApiClient>,
    spec: ToolSpec,
}

impl JokeSearchTool {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let spec = ToolSpec::new("jokes_search", "Search dad jokes by keyword")
            .with_param(ParamSpec::required(
                "query",
                ParamType::String,
                "Keyword the jokes should be about",
            ))
            .with_param(ParamSpec::optional(
                "limit",
                ParamType::Integer,
                "Maximum number of jokes (1-30, default 5)",
            ));
        Self { api, spec }
    }
}

#[async_trait]
impl Tool for JokeSearchTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn invoke(&self, params: &Map<String, Value>) -> Result<Value, ToolError> {
        let checked = self.spec.check(params)?;
        let term = checked.str("query").unwrap_or_default().trim().to_string();
        let limit = checked.i64("limit").unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        info!(term = %term, limit, "Searching dad jokes");

        let mut query = BTreeMap::new();
        query.insert("term".to_string(), term.clone());
        query.insert("limit".to_string(), limit.to_string());

        let raw = match self.api.get_json("search", &query, None).await {
            Err(ToolError::Permanent {
                kind: PermanentKind::NotFound,
                ..
            }) => {
                return Err(ToolError::permanent(
                    PermanentKind::NotFound,
                    format!("No jokes found for '{}'", term),
                ))
            }
            other => other?,
        };
        normalize_joke_search(&raw, &term, limit as usize)
    }
}
