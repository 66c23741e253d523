//! Errors raised by the planner, executor, verifier and the assistant

use crate::llm::LlmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("Query is empty")]
    EmptyQuery,

    #[error("Planner LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Plan response has no 'steps' array")]
    MissingSteps,

    #[error("Plan contains no steps")]
    EmptyPlan,

    #[error("Step {step_index} is not a JSON object")]
    MalformedStep { step_index: usize },

    #[error("Step {step_index} uses unknown tool '{tool}' (available: {available})")]
    UnknownTool {
        step_index: usize,
        tool: String,
        available: String,
    },

    #[error("Step {step_index} ({tool}) is missing required parameter '{param}'")]
    MissingParameter {
        step_index: usize,
        tool: String,
        param: String,
    },

    #[error("Step {step_index} ({tool}): {reason}")]
    InvalidParameter {
        step_index: usize,
        tool: String,
        reason: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Plan is not executable: {0}")]
    InvalidPlan(String),

    #[error("Execution cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("Verifier LLM call failed: {0}")]
    Llm(#[from] LlmError),
}

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Planning failed: {0}")]
    Planning(#[from] PlanningError),

    #[error("Execution failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Verification failed: {0}")]
    Verification(#[from] VerifierError),

    #[error("Request cancelled")]
    Cancelled,
}

fn llm_help(err: &LlmError) -> &'static str {
    match err {
        LlmError::AuthenticationError { .. } | LlmError::ConfigurationError { .. } => {
            "Help: The LLM provider rejected the credentials. Check:\n\
             - Is GROQ_API_KEY (or your provider's key) set?\n\
             - Does AIOPS_PROVIDER match the key you configured?"
        }
        LlmError::TimeoutError { .. } => {
            "Help: The LLM did not answer in time. Try again or raise AIOPS_REQUEST_TIMEOUT."
        }
        LlmError::RateLimitError { .. } => {
            "Help: The LLM provider is rate limiting requests. Wait a moment and retry."
        }
        LlmError::InvalidJson { .. } => {
            "Help: The model did not return valid JSON. Retry, or pick a stronger model with AIOPS_MODEL."
        }
        LlmError::NetworkError { .. } => "Help: Check your internet connection.",
        LlmError::ApiError { .. } | LlmError::Other { .. } => {
            "Help: The LLM provider returned an error. Retry in a moment."
        }
    }
}

impl AssistantError {
    /// User-facing explanation with troubleshooting hints
    pub fn help_message(&self) -> String {
        match self {
            AssistantError::Planning(PlanningError::EmptyQuery) => {
                "Error: No query given\n\nHelp: Ask something, e.g. aiops ask \"weather in Paris\""
                    .to_string()
            }
            AssistantError::Planning(PlanningError::Llm(e))
            | AssistantError::Verification(VerifierError::Llm(e)) => {
                format!("Error: {}\n\n{}", self, llm_help(e))
            }
            AssistantError::Planning(e @ PlanningError::UnknownTool { .. }) => format!(
                "Error: Could not build a plan\n{}\n\n\
                 Help: Only weather, news and jokes requests are supported. \
                 Run `aiops tools` to list them.",
                e
            ),
            AssistantError::Planning(e) => format!(
                "Error: Could not build a plan\n{}\n\n\
                 Help: Try rephrasing the request more concretely.",
                e
            ),
            AssistantError::Cancelled | AssistantError::Execution(ExecutionError::Cancelled) => {
                "Error: Request cancelled".to_string()
            }
            AssistantError::Execution(e) => format!("Error: {}", e),
        }
    }
}
