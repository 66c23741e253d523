//! Shared fixtures for pipeline integration tests
//!
//! Stub tools mirror the names and parameters of the real adapters but
//! answer from a script, so no network access is needed.

#![allow(dead_code)]

use aiops::llm::{MockLLMClient, MockResponse};
use aiops::pipeline::{Executor, Planner, RecordingSleeper, Verifier};
use aiops::tools::{ParamSpec, ParamType, Tool, ToolError, ToolRegistry, ToolSpec, TransientKind};
use aiops::Assistant;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Tool answering from a queue; the last scripted reply repeats once the
/// queue is down to one entry
pub struct StubTool {
    spec: ToolSpec,
    replies: Mutex<VecDeque<Result<Value, ToolError>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    params_seen: Mutex<Vec<Map<String, Value>>>,
}

impl StubTool {
    pub fn new(spec: ToolSpec) -> Self {
        Self {
            spec,
            replies: Mutex::new(VecDeque::new()),
            delay: None,
            calls: AtomicUsize::new(0),
            params_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, reply: Result<Value, ToolError>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    /// Sleeps before answering, to trip the executor's per-call timeout
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn params_seen(&self) -> Vec<Map<String, Value>> {
        self.params_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for StubTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn invoke(&self, params: &Map<String, Value>) -> Result<Value, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.params_seen.lock().unwrap().push(params.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        reply.unwrap_or_else(|| Ok(json!({})))
    }
}

pub fn weather_spec() -> ToolSpec {
    ToolSpec::new("weather", "Get the current weather for a city").with_param(
        ParamSpec::required("city", ParamType::String, "City name"),
    )
}

pub fn jokes_spec() -> ToolSpec {
    ToolSpec::new("jokes", "Get a random dad joke")
}

pub fn jokes_search_spec() -> ToolSpec {
    ToolSpec::new("jokes_search", "Search dad jokes by keyword")
        .with_param(ParamSpec::required("query", ParamType::String, "Keyword"))
        .with_param(ParamSpec::optional("limit", ParamType::Integer, "Max jokes"))
}

pub fn news_spec() -> ToolSpec {
    ToolSpec::new("news_search", "Search news articles")
        .with_param(ParamSpec::required("query", ParamType::String, "Search terms"))
}

pub fn noida_weather() -> Value {
    json!({
        "location": {"city": "Noida", "country": "IN"},
        "weather": {"main": "Haze", "description": "haze"},
        "temperature": {"current": {"celsius": 28.6, "fahrenheit": 83.5}},
        "humidity": 61,
        "wind": {"speed_ms": 3.1}
    })
}

pub fn dream_jokes() -> Value {
    json!({
        "type": "search",
        "term": "dreams",
        "jokes": [{"id": "d1", "joke": "I told my wife she was drawing her eyebrows too high. She seemed surprised, then went back to dreaming."}]
    })
}

pub fn random_joke() -> Value {
    json!({
        "type": "random",
        "joke": "I'm reading a book about anti-gravity. It's impossible to put down."
    })
}

pub fn network_error() -> ToolError {
    ToolError::transient(TransientKind::Network, "connection reset")
}

pub fn plan_json(steps: Value) -> MockResponse {
    MockResponse::json(json!({
        "task": "test",
        "steps": steps,
        "expected_output": "answer"
    }))
}

pub fn verdict_json(complete: bool, answer: &str) -> MockResponse {
    MockResponse::json(json!({
        "is_complete": complete,
        "missing_info": [],
        "formatted_answer": answer,
        "suggestions": [],
        "retry_steps": []
    }))
}

pub fn registry(tools: Vec<Arc<dyn Tool>>) -> Arc<ToolRegistry> {
    Arc::new(ToolRegistry::new(tools).expect("stub tool names are valid"))
}

/// Assistant over stub tools whose backoff sleeps are recorded, not awaited
pub struct Harness {
    pub llm: Arc<MockLLMClient>,
    pub sleeper: Arc<RecordingSleeper>,
    pub assistant: Assistant,
}

impl Harness {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self::with_executor(tools, |executor| executor)
    }

    pub fn with_executor(
        tools: Vec<Arc<dyn Tool>>,
        customize: impl FnOnce(Executor) -> Executor,
    ) -> Self {
        let llm = Arc::new(MockLLMClient::new());
        let sleeper = Arc::new(RecordingSleeper::new());
        let registry = registry(tools);

        let planner = Planner::new(llm.clone(), registry.clone());
        let executor = customize(Executor::new(registry).with_sleeper(sleeper.clone()));
        let verifier = Verifier::new(llm.clone());

        Self {
            llm,
            sleeper,
            assistant: Assistant::new(planner, executor, verifier),
        }
    }
}
