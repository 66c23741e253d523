//! Request-scoped data flowing through plan → execute → verify

use crate::tools::ToolError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// One tool invocation in a plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStep {
    pub step_index: usize,
    pub tool_name: String,
    pub parameters: Map<String, Value>,
    pub action: String,
}

/// Validated, ordered list of steps for one query
///
/// Only the planner builds plans, so every step names a registered tool and
/// carries its required parameters with the declared types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    query: String,
    steps: Vec<PlanStep>,
    expected_output: Option<String>,
}

impl Plan {
    pub(crate) fn new(
        query: impl Into<String>,
        steps: Vec<PlanStep>,
        expected_output: Option<String>,
    ) -> Self {
        Self {
            query: query.into(),
            steps,
            expected_output,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&PlanStep> {
        self.steps.get(index)
    }

    pub fn expected_output(&self) -> Option<&str> {
        self.expected_output.as_deref()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.tool_name.as_str()).collect()
    }

    /// Appends validated steps, renumbering them after the existing ones
    ///
    /// Returns the indices the new steps received.
    pub(crate) fn append(&mut self, steps: Vec<PlanStep>) -> Vec<usize> {
        let offset = self.steps.len();
        let mut indices = Vec::with_capacity(steps.len());
        for (i, mut step) in steps.into_iter().enumerate() {
            step.step_index = offset + i;
            indices.push(step.step_index);
            self.steps.push(step);
        }
        indices
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failure,
}

/// Outcome of one plan step after all attempts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub step_index: usize,
    pub tool_name: String,
    pub action: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    pub attempt_count: u32,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl StepResult {
    pub fn success(step: &PlanStep, payload: Value, attempt_count: u32, elapsed: Duration) -> Self {
        Self {
            step_index: step.step_index,
            tool_name: step.tool_name.clone(),
            action: step.action.clone(),
            status: StepStatus::Success,
            payload: Some(payload),
            error: None,
            attempt_count,
            elapsed,
        }
    }

    pub fn failure(
        step: &PlanStep,
        error: ToolError,
        attempt_count: u32,
        elapsed: Duration,
    ) -> Self {
        Self {
            step_index: step.step_index,
            tool_name: step.tool_name.clone(),
            action: step.action.clone(),
            status: StepStatus::Failure,
            payload: None,
            error: Some(error),
            attempt_count,
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }

    pub fn error_message(&self) -> String {
        self.error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Partial,
    Failure,
}

impl ExecutionStatus {
    pub fn from_results(results: &[StepResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        if succeeded == 0 {
            ExecutionStatus::Failure
        } else if succeeded == results.len() {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Partial
        }
    }
}

/// Step results in plan order plus the overall status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    results: Vec<StepResult>,
    status: ExecutionStatus,
}

impl ExecutionResult {
    pub fn new(results: Vec<StepResult>) -> Self {
        let status = ExecutionStatus::from_results(&results);
        Self { results, status }
    }

    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn result(&self, step_index: usize) -> Option<&StepResult> {
        self.results.iter().find(|r| r.step_index == step_index)
    }

    pub fn successful(&self) -> impl Iterator<Item = &StepResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &StepResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn succeeded_count(&self) -> usize {
        self.successful().count()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Replaces results with matching step indices and appends the rest,
    /// keeping step order
    pub fn merge(&mut self, newer: ExecutionResult) {
        for result in newer.results {
            match self
                .results
                .iter_mut()
                .find(|r| r.step_index == result.step_index)
            {
                Some(slot) => *slot = result,
                None => self.results.push(result),
            }
        }
        self.results.sort_by_key(|r| r.step_index);
        self.status = ExecutionStatus::from_results(&self.results);
    }
}

/// A step that could not contribute to the answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedStep {
    pub step_index: usize,
    pub tool: String,
    pub action: String,
    pub error: String,
}

impl From<&StepResult> for FailedStep {
    fn from(result: &StepResult) -> Self {
        Self {
            step_index: result.step_index,
            tool: result.tool_name.clone(),
            action: result.action.clone(),
            error: result.error_message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalAnswer {
    pub text: String,
    pub supporting_data: Vec<Value>,
    pub complete: bool,
    pub missing_info: Vec<String>,
    pub suggestions: Vec<String>,
    pub failed_steps: Vec<FailedStep>,
}

/// Verifier request for one more round
///
/// Empty `step_indices` asks for a replan covering `missing_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetryDirective {
    pub step_indices: Vec<usize>,
    pub tools: Vec<String>,
    pub missing_info: Vec<String>,
    pub partial_answer: String,
}

impl RetryDirective {
    pub fn is_replan(&self) -> bool {
        self.step_indices.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verification {
    Answer(FinalAnswer),
    Retry(RetryDirective),
}
