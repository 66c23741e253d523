//! Judges execution results and produces the final answer
//!
//! The LLM only sees successful payloads plus the names and errors of failed
//! steps; the failure note under every answer is rendered here, so a failed
//! step can never disappear from the output.

use super::error::VerifierError;
use super::format::{all_failed_answer, failed_steps, failure_note, render_results};
use super::prompt::{verifier_user_prompt, VERIFIER_SYSTEM_PROMPT};
use super::types::{
    ExecutionResult, ExecutionStatus, FailedStep, FinalAnswer, RetryDirective, Verification,
};
use crate::llm::{complete_json, LLMClient};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Verdict document as returned by the model
///
/// Only `is_complete` and `formatted_answer` are strictly typed; the advisory
/// lists keep their well-formed entries and drop the rest.
#[derive(Debug, Default, Deserialize)]
struct RawVerdict {
    #[serde(default)]
    is_complete: Option<bool>,
    #[serde(default, deserialize_with = "lenient_strings")]
    missing_info: Vec<String>,
    #[serde(default)]
    formatted_answer: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    suggestions: Vec<String>,
    #[serde(default, deserialize_with = "lenient_indices")]
    retry_steps: Vec<usize>,
}

fn lenient_items<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    })
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_items(deserializer)?
        .into_iter()
        .filter_map(|item| match item {
            Value::String(text) if !text.trim().is_empty() => Some(text),
            _ => None,
        })
        .collect())
}

/// Step indices as non-negative integers or numeric strings
fn lenient_indices<'de, D>(deserializer: D) -> Result<Vec<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_items(deserializer)?
        .into_iter()
        .filter_map(|item| match item {
            Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
        .collect())
}

pub struct Verifier {
    llm: Arc<dyn LLMClient>,
    fallback: bool,
}

impl Verifier {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self {
            llm,
            fallback: false,
        }
    }

    /// Render results without the LLM when the verification call fails
    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback = enabled;
        self
    }

    pub async fn verify(
        &self,
        result: &ExecutionResult,
        query: &str,
    ) -> Result<Verification, VerifierError> {
        if result.status() == ExecutionStatus::Failure {
            info!(
                failed = result.len(),
                "No step succeeded, skipping verifier LLM"
            );
            return Ok(Verification::Answer(all_failed_answer(query, result)));
        }

        let start = Instant::now();
        let user_prompt = verifier_user_prompt(query, result);
        let verdict: RawVerdict = match complete_json(
            self.llm.as_ref(),
            VERIFIER_SYSTEM_PROMPT,
            &user_prompt,
            "verification",
        )
        .await
        {
            Ok(verdict) => verdict,
            Err(e) if self.fallback => {
                warn!(error = %e, "Verifier LLM failed, using plain formatting");
                return Ok(Verification::Answer(self.fallback_answer(query, result)));
            }
            Err(e) => return Err(e.into()),
        };

        let verification = self.judge(query, result, verdict);
        info!(
            outcome = match &verification {
                Verification::Answer(a) if a.complete => "complete",
                Verification::Answer(_) => "incomplete",
                Verification::Retry(_) => "retry",
            },
            duration_ms = start.elapsed().as_millis() as u64,
            "Results verified"
        );
        Ok(verification)
    }

    fn judge(&self, query: &str, result: &ExecutionResult, verdict: RawVerdict) -> Verification {
        let failed = failed_steps(result);
        let llm_complete = verdict.is_complete.unwrap_or(true);
        let llm_missing = verdict.missing_info;
        let missing_info = merge_missing(llm_missing.clone(), &failed);

        let body = verdict
            .formatted_answer
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| render_results(query, result));

        if !llm_complete {
            let step_indices = retry_candidates(result, &verdict.retry_steps);

            if !step_indices.is_empty() {
                let tools = step_indices
                    .iter()
                    .filter_map(|i| result.result(*i))
                    .map(|r| r.tool_name.clone())
                    .collect();
                return Verification::Retry(RetryDirective {
                    step_indices,
                    tools,
                    missing_info,
                    partial_answer: body,
                });
            }

            if failed.is_empty() && !llm_missing.is_empty() {
                return Verification::Retry(RetryDirective {
                    step_indices: Vec::new(),
                    tools: Vec::new(),
                    missing_info,
                    partial_answer: body,
                });
            }
        }

        FinalAnswer {
            text: body + &failure_note(&failed),
            supporting_data: supporting_data(result),
            complete: llm_complete && failed.is_empty(),
            missing_info,
            suggestions: verdict.suggestions,
            failed_steps: failed,
        }
        .into()
    }

    /// Converts a directive that can no longer be acted on into an answer
    pub fn finalize(&self, directive: RetryDirective, result: &ExecutionResult) -> FinalAnswer {
        let failed = failed_steps(result);

        let mut text = if directive.partial_answer.trim().is_empty() {
            render_results("your request", result)
        } else {
            directive.partial_answer
        };
        text.push_str(&failure_note(&failed));
        if failed.is_empty() && !directive.missing_info.is_empty() {
            text.push_str("\n\n**Note:** The following could not be found:");
            for item in &directive.missing_info {
                text.push_str(&format!("\n- {}", item));
            }
        }

        let suggestions = if !failed.is_empty() {
            vec!["Some services were unavailable; try the request again later".to_string()]
        } else {
            vec!["Try rephrasing the request more specifically".to_string()]
        };

        FinalAnswer {
            text,
            supporting_data: supporting_data(result),
            complete: false,
            missing_info: merge_missing(directive.missing_info, &failed),
            suggestions,
            failed_steps: failed,
        }
    }

    fn fallback_answer(&self, query: &str, result: &ExecutionResult) -> FinalAnswer {
        let failed = failed_steps(result);
        FinalAnswer {
            text: render_results(query, result) + &failure_note(&failed),
            supporting_data: supporting_data(result),
            complete: false,
            missing_info: merge_missing(Vec::new(), &failed),
            suggestions: Vec::new(),
            failed_steps: failed,
        }
    }
}

impl From<FinalAnswer> for Verification {
    fn from(answer: FinalAnswer) -> Self {
        Verification::Answer(answer)
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("llm", &self.llm.name())
            .field("fallback", &self.fallback)
            .finish()
    }
}

fn supporting_data(result: &ExecutionResult) -> Vec<Value> {
    result
        .successful()
        .filter_map(|r| r.payload.clone())
        .collect()
}

/// Failed steps with a transient error, narrowed to the model's picks when
/// it named any of them
fn retry_candidates(result: &ExecutionResult, named: &[usize]) -> Vec<usize> {
    let retryable: Vec<usize> = result
        .failed()
        .filter(|r| r.error.as_ref().is_some_and(|e| e.is_transient()))
        .map(|r| r.step_index)
        .collect();

    let mut picked: Vec<usize> = retryable
        .iter()
        .copied()
        .filter(|i| named.contains(i))
        .collect();
    if picked.is_empty() {
        picked = retryable;
    }
    picked
}

fn merge_missing(mut missing: Vec<String>, failed: &[FailedStep]) -> Vec<String> {
    for step in failed {
        if !missing.iter().any(|m| m == &step.action) {
            missing.push(step.action.clone());
        }
    }
    missing
}
