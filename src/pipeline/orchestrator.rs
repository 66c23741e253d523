use super::error::{AssistantError, PlanningError};
use super::executor::Executor;
use super::planner::Planner;
use super::types::{ExecutionResult, FinalAnswer, Plan, Verification};
use super::verifier::Verifier;
use crate::config::AiopsConfig;
use crate::llm::{select_llm_client, LLMClient, LlmError};
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::tools::ToolRegistry;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Rounds of re-execution or re-planning allowed after the first verification
pub const MAX_RETRY_CYCLES: usize = 1;

/// Everything produced while answering one query
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub request_id: String,
    pub plan: Plan,
    pub execution: ExecutionResult,
    pub answer: FinalAnswer,
    pub retry_cycles: usize,
}

pub struct Assistant {
    planner: Planner,
    executor: Executor,
    verifier: Verifier,
    progress_handler: Option<Arc<dyn ProgressHandler>>,
}

impl Assistant {
    pub fn new(planner: Planner, executor: Executor, verifier: Verifier) -> Self {
        Self {
            planner,
            executor,
            verifier,
            progress_handler: None,
        }
    }

    /// Wires the configured LLM provider and the default tool set
    pub fn from_config(config: &AiopsConfig) -> Result<Self, LlmError> {
        let selected = select_llm_client(config)?;
        info!(provider = ?selected.provider, model = %config.model, "Using LLM client");
        let registry = Arc::new(ToolRegistry::with_defaults(config));
        Ok(Self::with_llm(config, selected.client, registry))
    }

    pub fn with_llm(
        config: &AiopsConfig,
        llm: Arc<dyn LLMClient>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        let planner = Planner::new(llm.clone(), registry.clone());
        let executor = Executor::from_config(registry, config);
        let verifier = Verifier::new(llm).with_fallback(config.verifier_fallback);
        Self::new(planner, executor, verifier)
    }

    /// Reports progress from the assistant and its executor to `handler`
    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.executor = self.executor.with_progress(handler.clone());
        self.progress_handler = Some(handler);
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.planner.registry()
    }

    /// Plans a query without executing it
    pub async fn plan(&self, text: &str) -> Result<Plan, PlanningError> {
        self.planner.plan(text).await
    }

    pub async fn handle_query(&self, text: &str) -> Result<FinalAnswer, AssistantError> {
        self.handle_query_with_cancel(text, &CancellationToken::new())
            .await
    }

    pub async fn handle_query_with_cancel(
        &self,
        text: &str,
        token: &CancellationToken,
    ) -> Result<FinalAnswer, AssistantError> {
        self.run_query(text, token).await.map(|report| report.answer)
    }

    /// Answers a query, keeping the plan and step results alongside the answer
    pub async fn run_query(
        &self,
        text: &str,
        token: &CancellationToken,
    ) -> Result<QueryReport, AssistantError> {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("request", request_id = %request_id);

        let outcome = self
            .process(text, token, request_id.clone())
            .instrument(span)
            .await;

        if let Err(e) = &outcome {
            error!(request_id = %request_id, error = %e, "Query failed");
            self.emit(ProgressEvent::Failed {
                error: e.to_string(),
            });
        }
        outcome
    }

    async fn process(
        &self,
        text: &str,
        token: &CancellationToken,
        request_id: String,
    ) -> Result<QueryReport, AssistantError> {
        let start = Instant::now();
        info!(query = %text, "Handling query");
        self.emit(ProgressEvent::Started {
            request_id: request_id.clone(),
            query: text.to_string(),
        });

        self.emit(ProgressEvent::PlanningStarted);
        let planning_start = Instant::now();
        let mut plan = until_cancelled(token, self.planner.plan(text)).await?;
        self.emit(ProgressEvent::PlanReady {
            steps: plan.len(),
            tools: plan.tool_names().iter().map(|t| t.to_string()).collect(),
            duration: planning_start.elapsed(),
        });

        let mut result = self.executor.run_with_cancel(&plan, token).await?;

        self.emit(ProgressEvent::VerificationStarted);
        let mut verification =
            until_cancelled(token, self.verifier.verify(&result, plan.query())).await?;

        let mut cycles = 0;
        let answer = loop {
            match verification {
                Verification::Answer(answer) => break answer,
                Verification::Retry(directive) if cycles < MAX_RETRY_CYCLES => {
                    cycles += 1;
                    info!(
                        cycle = cycles,
                        steps = ?directive.step_indices,
                        missing = ?directive.missing_info,
                        "Verifier requested another round"
                    );
                    self.emit(ProgressEvent::RetryCycleStarted {
                        step_indices: directive.step_indices.clone(),
                        replan: directive.is_replan(),
                    });

                    if directive.is_replan() {
                        let feedback = directive.missing_info.join("; ");
                        let refined =
                            until_cancelled(token, self.planner.refine(&plan, &feedback)).await;
                        match refined {
                            Ok(refined) => {
                                let added = plan.append(refined.steps().to_vec());
                                let extra = self.executor.rerun(&plan, &added, token).await?;
                                result.merge(extra);
                            }
                            Err(AssistantError::Cancelled) => {
                                return Err(AssistantError::Cancelled);
                            }
                            Err(e) => {
                                warn!(error = %e, "Refinement failed, finishing with partial answer");
                                break self.verifier.finalize(directive, &result);
                            }
                        }
                    } else {
                        let retried = self
                            .executor
                            .rerun(&plan, &directive.step_indices, token)
                            .await?;
                        result.merge(retried);
                    }

                    self.emit(ProgressEvent::VerificationStarted);
                    verification =
                        until_cancelled(token, self.verifier.verify(&result, plan.query())).await?;
                }
                Verification::Retry(directive) => {
                    break self.verifier.finalize(directive, &result);
                }
            }
        };

        info!(
            complete = answer.complete,
            failed_steps = answer.failed_steps.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Query answered"
        );
        self.emit(ProgressEvent::Completed {
            complete: answer.complete,
            total_time: start.elapsed(),
        });

        Ok(QueryReport {
            request_id,
            plan,
            execution: result,
            answer,
            retry_cycles: cycles,
        })
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress_handler {
            handler.on_progress(&event);
        }
    }
}

/// Runs an LLM-backed stage unless the token fires first
async fn until_cancelled<T, E>(
    token: &CancellationToken,
    stage: impl Future<Output = Result<T, E>>,
) -> Result<T, AssistantError>
where
    AssistantError: From<E>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(AssistantError::Cancelled),
        outcome = stage => outcome.map_err(AssistantError::from),
    }
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("planner", &self.planner)
            .field("executor", &self.executor)
            .field("verifier", &self.verifier)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLLMClient, MockResponse};
    use crate::pipeline::retry::RecordingSleeper;
    use crate::progress::LoggingHandler;
    use crate::tools::{Tool, ToolError, ToolSpec, TransientKind};
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails with a transient error for the first `failures` calls
    struct FlakyTool {
        spec: ToolSpec,
        failures: usize,
        calls: AtomicUsize,
    }

    impl FlakyTool {
        fn new(name: &str, failures: usize) -> Arc<Self> {
            Arc::new(Self {
                spec: ToolSpec::new(name, "flaky"),
                failures,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Tool for FlakyTool {
        fn spec(&self) -> &ToolSpec {
            &self.spec
        }

        async fn invoke(&self, _params: &Map<String, Value>) -> Result<Value, ToolError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(ToolError::transient(TransientKind::Unavailable, "HTTP 503"))
            } else {
                Ok(json!({"tool": self.spec.name, "call": call}))
            }
        }
    }

    /// Succeeds, then cancels the request it is part of
    struct InterruptingTool {
        spec: ToolSpec,
        token: CancellationToken,
    }

    #[async_trait]
    impl Tool for InterruptingTool {
        fn spec(&self) -> &ToolSpec {
            &self.spec
        }

        async fn invoke(&self, _params: &Map<String, Value>) -> Result<Value, ToolError> {
            self.token.cancel();
            Ok(json!({"tool": self.spec.name}))
        }
    }

    fn assistant(
        tools: Vec<Arc<FlakyTool>>,
        responses: Vec<MockResponse>,
    ) -> (Assistant, Arc<MockLLMClient>) {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_responses(responses);
        let tools: Vec<Arc<dyn Tool>> = tools.into_iter().map(|t| t as Arc<dyn Tool>).collect();
        let registry = Arc::new(ToolRegistry::new(tools).unwrap());

        let planner = Planner::new(mock.clone(), registry.clone());
        let executor = Executor::new(registry).with_sleeper(Arc::new(RecordingSleeper::new()));
        let verifier = Verifier::new(mock.clone());
        (Assistant::new(planner, executor, verifier), mock)
    }

    #[tokio::test]
    async fn test_cancel_before_verification_skips_verifier_llm() {
        let token = CancellationToken::new();
        let tool: Arc<dyn Tool> = Arc::new(InterruptingTool {
            spec: ToolSpec::new("alpha", "interrupts"),
            token: token.clone(),
        });
        let mock = Arc::new(MockLLMClient::new());
        mock.add_responses(vec![
            MockResponse::json(json!({"steps": [{"tool": "alpha"}]})),
            MockResponse::json(json!({"is_complete": true, "formatted_answer": "alpha"})),
        ]);
        let registry = Arc::new(ToolRegistry::new(vec![tool]).unwrap());
        let assistant = Assistant::new(
            Planner::new(mock.clone(), registry.clone()),
            Executor::new(registry),
            Verifier::new(mock.clone()),
        );

        let err = assistant.run_query("alpha", &token).await.unwrap_err();

        assert!(matches!(err, AssistantError::Cancelled));
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.remaining_responses(), 1);
    }

    #[tokio::test]
    async fn test_assistant_with_progress() {
        let (assistant, _) = assistant(vec![], vec![]);
        let assistant = assistant.with_progress(Arc::new(LoggingHandler));
        assert!(assistant.progress_handler.is_some());
    }

    #[tokio::test]
    async fn test_retry_cycle_reruns_failed_step_once() {
        let alpha = FlakyTool::new("alpha", 0);
        let beta = FlakyTool::new("beta", 3);
        let (assistant, mock) = assistant(
            vec![alpha.clone(), beta.clone()],
            vec![
                MockResponse::json(json!({"steps": [{"tool": "alpha"}, {"tool": "beta"}]})),
                MockResponse::json(json!({"is_complete": false, "formatted_answer": "alpha only"})),
                MockResponse::json(json!({"is_complete": true, "formatted_answer": "alpha and beta"})),
            ],
        );

        let report = assistant
            .run_query("alpha and beta", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.retry_cycles, 1);
        assert_eq!(alpha.calls.load(Ordering::SeqCst), 1);
        assert_eq!(beta.calls.load(Ordering::SeqCst), 4);
        assert!(report.answer.complete);
        assert_eq!(report.answer.text, "alpha and beta");
        assert_eq!(mock.remaining_responses(), 0);
    }

    #[tokio::test]
    async fn test_retry_budget_is_one_cycle() {
        let beta = FlakyTool::new("beta", usize::MAX);
        let alpha = FlakyTool::new("alpha", 0);
        let incomplete = json!({"is_complete": false, "formatted_answer": "alpha only"});
        let (assistant, mock) = assistant(
            vec![alpha, beta.clone()],
            vec![
                MockResponse::json(json!({"steps": [{"tool": "alpha"}, {"tool": "beta"}]})),
                MockResponse::json(incomplete.clone()),
                MockResponse::json(incomplete),
            ],
        );

        let answer = assistant.handle_query("alpha and beta").await.unwrap();

        assert_eq!(beta.calls.load(Ordering::SeqCst), 6);
        assert!(!answer.complete);
        assert!(answer.text.starts_with("alpha only"));
        assert!(answer.text.contains("Run beta (beta)"));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_replan_appends_steps() {
        let alpha = FlakyTool::new("alpha", 0);
        let beta = FlakyTool::new("beta", 0);
        let (assistant, _) = assistant(
            vec![alpha, beta.clone()],
            vec![
                MockResponse::json(json!({"steps": [{"tool": "alpha"}]})),
                MockResponse::json(json!({
                    "is_complete": false,
                    "missing_info": ["beta data"],
                    "formatted_answer": "alpha only"
                })),
                MockResponse::json(json!({"steps": [{"tool": "beta"}]})),
                MockResponse::json(json!({"is_complete": true, "formatted_answer": "both"})),
            ],
        );

        let report = assistant
            .run_query("alpha and beta", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.plan.tool_names(), vec!["alpha", "beta"]);
        assert_eq!(report.execution.len(), 2);
        assert_eq!(beta.calls.load(Ordering::SeqCst), 1);
        assert!(report.answer.complete);
    }

    #[tokio::test]
    async fn test_failed_refine_finalizes_partial_answer() {
        let alpha = FlakyTool::new("alpha", 0);
        let (assistant, _) = assistant(
            vec![alpha],
            vec![
                MockResponse::json(json!({"steps": [{"tool": "alpha"}]})),
                MockResponse::json(json!({
                    "is_complete": false,
                    "missing_info": ["gamma data"],
                    "formatted_answer": "alpha only"
                })),
                MockResponse::json(json!({"steps": [{"tool": "gamma"}]})),
            ],
        );

        let answer = assistant.handle_query("alpha and gamma").await.unwrap();

        assert!(!answer.complete);
        assert!(answer.text.contains("gamma data"));
    }
}
