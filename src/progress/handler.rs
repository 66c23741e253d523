//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while a query moves through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Query accepted
    Started { request_id: String, query: String },

    /// Planner asked the LLM for a plan
    PlanningStarted,

    /// Plan validated
    PlanReady {
        steps: usize,
        tools: Vec<String>,
        duration: Duration,
    },

    /// Tool call attempt started
    StepStarted {
        step_index: usize,
        tool_name: String,
        attempt: u32,
    },

    /// Transient failure, another attempt follows after `delay`
    StepRetrying {
        step_index: usize,
        tool_name: String,
        attempt: u32,
        delay: Duration,
        error: String,
    },

    /// Step finished (successfully or not)
    StepComplete {
        step_index: usize,
        tool_name: String,
        success: bool,
        attempts: u32,
        elapsed: Duration,
    },

    /// Verifier asked the LLM to judge and format the results
    VerificationStarted,

    /// Verifier requested another round
    RetryCycleStarted {
        step_indices: Vec<usize>,
        replan: bool,
    },

    /// Final answer produced
    Completed { complete: bool, total_time: Duration },

    /// Request aborted
    Failed { error: String },
}

/// Trait for handling progress events
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
