//! Plan → execute → verify pipeline
//!
//! [`Planner`] asks the LLM for a [`Plan`] and validates it against the tool
//! registry, [`Executor`] runs the steps in order with bounded retries, and
//! [`Verifier`] turns the results into a [`FinalAnswer`] or asks for one more
//! round. [`Assistant`] wires the three together.

pub mod error;
pub mod executor;
pub mod format;
pub mod orchestrator;
pub mod planner;
pub mod prompt;
pub mod retry;
pub mod types;
pub mod verifier;

pub use error::{AssistantError, ExecutionError, PlanningError, VerifierError};
pub use executor::Executor;
pub use orchestrator::{Assistant, QueryReport, MAX_RETRY_CYCLES};
pub use planner::Planner;
pub use retry::{RecordingSleeper, RetryPolicy, Sleeper, TokioSleeper};
pub use types::{
    ExecutionResult, ExecutionStatus, FailedStep, FinalAnswer, Plan, PlanStep, RetryDirective,
    StepResult, StepStatus, Verification,
};
pub use verifier::Verifier;
