//! Sequential plan execution with per-step retry
//!
//! A failing step never aborts the run: it is recorded as a failed
//! [`StepResult`] and execution moves on. Only a structurally invalid plan or
//! cancellation ends a run early.

use super::error::ExecutionError;
use super::retry::{RetryPolicy, Sleeper, TokioSleeper};
use super::types::{ExecutionResult, Plan, PlanStep, StepResult};
use crate::config::AiopsConfig;
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use crate::tools::{Tool, ToolError, ToolRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Executor {
    registry: Arc<ToolRegistry>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    tool_timeout: Duration,
    progress: Arc<dyn ProgressHandler>,
}

impl Executor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            progress: Arc::new(NoOpHandler),
        }
    }

    pub fn from_config(registry: Arc<ToolRegistry>, config: &AiopsConfig) -> Self {
        Self::new(registry)
            .with_policy(RetryPolicy::new(config.max_attempts, config.backoff_base()))
            .with_tool_timeout(config.tool_timeout())
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn run(&self, plan: &Plan) -> Result<ExecutionResult, ExecutionError> {
        self.run_with_cancel(plan, &CancellationToken::new()).await
    }

    pub async fn run_with_cancel(
        &self,
        plan: &Plan,
        token: &CancellationToken,
    ) -> Result<ExecutionResult, ExecutionError> {
        let indices: Vec<usize> = (0..plan.len()).collect();
        self.execute(plan, &indices, token).await
    }

    /// Executes only the listed steps, in step order
    pub async fn rerun(
        &self,
        plan: &Plan,
        step_indices: &[usize],
        token: &CancellationToken,
    ) -> Result<ExecutionResult, ExecutionError> {
        let mut indices = step_indices.to_vec();
        indices.sort_unstable();
        indices.dedup();
        self.execute(plan, &indices, token).await
    }

    async fn execute(
        &self,
        plan: &Plan,
        indices: &[usize],
        token: &CancellationToken,
    ) -> Result<ExecutionResult, ExecutionError> {
        let start = Instant::now();
        let work = self.resolve_steps(plan, indices)?;

        info!(steps = work.len(), "Executing plan");

        let mut results = Vec::with_capacity(work.len());
        for (step, tool) in work {
            if token.is_cancelled() {
                warn!(step = step.step_index, "Execution cancelled");
                return Err(ExecutionError::Cancelled);
            }
            results.push(self.run_step(step, tool, token).await?);
        }

        let result = ExecutionResult::new(results);
        info!(
            status = ?result.status(),
            succeeded = result.succeeded_count(),
            total = result.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Execution finished"
        );
        Ok(result)
    }

    fn resolve_steps<'p>(
        &self,
        plan: &'p Plan,
        indices: &[usize],
    ) -> Result<Vec<(&'p PlanStep, Arc<dyn Tool>)>, ExecutionError> {
        for (position, step) in plan.steps().iter().enumerate() {
            if step.step_index != position {
                return Err(ExecutionError::InvalidPlan(format!(
                    "step at position {} has index {}",
                    position, step.step_index
                )));
            }
        }

        indices
            .iter()
            .map(|&index| {
                let step = plan.step(index).ok_or_else(|| {
                    ExecutionError::InvalidPlan(format!(
                        "step {} does not exist (plan has {} steps)",
                        index,
                        plan.len()
                    ))
                })?;
                let tool = self.registry.get_tool(&step.tool_name).ok_or_else(|| {
                    ExecutionError::InvalidPlan(format!(
                        "step {} uses unregistered tool '{}'",
                        index, step.tool_name
                    ))
                })?;
                Ok((step, tool))
            })
            .collect()
    }

    async fn run_step(
        &self,
        step: &PlanStep,
        tool: Arc<dyn Tool>,
        token: &CancellationToken,
    ) -> Result<StepResult, ExecutionError> {
        let start = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            self.progress.on_progress(&ProgressEvent::StepStarted {
                step_index: step.step_index,
                tool_name: step.tool_name.clone(),
                attempt,
            });

            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ExecutionError::Cancelled),
                outcome = tokio::time::timeout(self.tool_timeout, tool.invoke(&step.parameters)) => outcome,
            };

            let error = match outcome {
                Ok(Ok(payload)) => {
                    debug!(
                        step = step.step_index,
                        tool = %step.tool_name,
                        attempt,
                        "Tool call succeeded"
                    );
                    let result = StepResult::success(step, payload, attempt, start.elapsed());
                    self.report_complete(&result);
                    return Ok(result);
                }
                Ok(Err(error)) => error,
                Err(_) => ToolError::timeout(format!(
                    "{} did not respond within {}s",
                    step.tool_name,
                    self.tool_timeout.as_secs_f64()
                )),
            };

            let delay = if error.is_transient() {
                self.policy.delay_after(attempt)
            } else {
                None
            };

            match delay {
                Some(delay) => {
                    warn!(
                        step = step.step_index,
                        tool = %step.tool_name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Tool call failed, retrying"
                    );
                    self.progress.on_progress(&ProgressEvent::StepRetrying {
                        step_index: step.step_index,
                        tool_name: step.tool_name.clone(),
                        attempt,
                        delay,
                        error: error.to_string(),
                    });
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return Err(ExecutionError::Cancelled),
                        _ = self.sleeper.sleep(delay) => {}
                    }
                }
                None => {
                    warn!(
                        step = step.step_index,
                        tool = %step.tool_name,
                        attempts = attempt,
                        error = %error,
                        "Step failed"
                    );
                    let result = StepResult::failure(step, error, attempt, start.elapsed());
                    self.report_complete(&result);
                    return Ok(result);
                }
            }
        }
    }

    fn report_complete(&self, result: &StepResult) {
        self.progress.on_progress(&ProgressEvent::StepComplete {
            step_index: result.step_index,
            tool_name: result.tool_name.clone(),
            success: result.is_success(),
            attempts: result.attempt_count,
            elapsed: result.elapsed,
        });
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("policy", &self.policy)
            .field("tool_timeout", &self.tool_timeout)
            .finish_non_exhaustive()
    }
}
