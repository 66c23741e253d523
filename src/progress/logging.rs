//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { request_id, query } => {
                info!(request_id = %request_id, query = %query, "Handling query");
            }
            ProgressEvent::PlanningStarted => {
                debug!("Requesting plan from LLM");
            }
            ProgressEvent::PlanReady {
                steps,
                tools,
                duration,
            } => {
                info!(
                    steps,
                    tools = %tools.join(", "),
                    duration_ms = duration.as_millis(),
                    "Plan ready"
                );
            }
            ProgressEvent::StepStarted {
                step_index,
                tool_name,
                attempt,
            } => {
                debug!(step = step_index, tool = %tool_name, attempt, "Invoking tool");
            }
            ProgressEvent::StepRetrying {
                step_index,
                tool_name,
                attempt,
                delay,
                error,
            } => {
                warn!(
                    step = step_index,
                    tool = %tool_name,
                    attempt,
                    delay_ms = delay.as_millis(),
                    error = %error,
                    "Transient tool failure, retrying"
                );
            }
            ProgressEvent::StepComplete {
                step_index,
                tool_name,
                success,
                attempts,
                elapsed,
            } => {
                if *success {
                    info!(
                        step = step_index,
                        tool = %tool_name,
                        attempts,
                        elapsed_ms = elapsed.as_millis(),
                        "Step complete"
                    );
                } else {
                    warn!(
                        step = step_index,
                        tool = %tool_name,
                        attempts,
                        elapsed_ms = elapsed.as_millis(),
                        "Step failed"
                    );
                }
            }
            ProgressEvent::VerificationStarted => {
                debug!("Verifying results");
            }
            ProgressEvent::RetryCycleStarted {
                step_indices,
                replan,
            } => {
                info!(steps = ?step_indices, replan, "Starting retry cycle");
            }
            ProgressEvent::Completed {
                complete,
                total_time,
            } => {
                info!(
                    complete,
                    total_time_ms = total_time.as_millis(),
                    "Query complete"
                );
            }
            ProgressEvent::Failed { error } => {
                warn!(error = %error, "Query failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_logging_all_events() {
        let handler = LoggingHandler;

        let events = vec![
            ProgressEvent::Started {
                request_id: "r-1".to_string(),
                query: "weather in Noida".to_string(),
            },
            ProgressEvent::PlanningStarted,
            ProgressEvent::PlanReady {
                steps: 1,
                tools: vec!["weather".to_string()],
                duration: Duration::from_millis(50),
            },
            ProgressEvent::StepStarted {
                step_index: 0,
                tool_name: "weather".to_string(),
                attempt: 1,
            },
            ProgressEvent::StepRetrying {
                step_index: 0,
                tool_name: "weather".to_string(),
                attempt: 1,
                delay: Duration::from_secs(1),
                error: "timeout".to_string(),
            },
            ProgressEvent::StepComplete {
                step_index: 0,
                tool_name: "weather".to_string(),
                success: true,
                attempts: 2,
                elapsed: Duration::from_millis(10),
            },
            ProgressEvent::StepComplete {
                step_index: 0,
                tool_name: "weather".to_string(),
                success: false,
                attempts: 3,
                elapsed: Duration::from_millis(10),
            },
            ProgressEvent::VerificationStarted,
            ProgressEvent::RetryCycleStarted {
                step_indices: vec![0],
                replan: false,
            },
            ProgressEvent::Completed {
                complete: true,
                total_time: Duration::from_secs(5),
            },
            ProgressEvent::Failed {
                error: "Test error".to_string(),
            },
        ];

        for event in events {
            handler.on_progress(&event);
        }
    }
}
