//! Output formatting for answers, plans, tools and configuration
//!
//! JSON and YAML outputs are serializations of the library types; the human
//! format is meant for terminals.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::AiopsConfig;
use crate::pipeline::{FinalAnswer, Plan, QueryReport, StepResult};
use crate::tools::ToolSpec;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Machine-readable JSON
    Json,
    Yaml,
    /// Terminal text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the answer of a query; with `show_plan` the plan and step
    /// results are included as well
    pub fn format_report(&self, report: &QueryReport, show_plan: bool) -> Result<String> {
        match self.format {
            OutputFormat::Json | OutputFormat::Yaml => {
                let value = if show_plan {
                    json!({
                        "request_id": report.request_id,
                        "generated_at": Utc::now().to_rfc3339(),
                        "answer": report.answer,
                        "plan": report.plan,
                        "execution": report.execution,
                        "retry_cycles": report.retry_cycles,
                    })
                } else {
                    json!({
                        "request_id": report.request_id,
                        "generated_at": Utc::now().to_rfc3339(),
                        "answer": report.answer,
                    })
                };
                self.serialize(&value, "query report")
            }
            OutputFormat::Human => {
                let mut output = String::new();
                if show_plan {
                    output.push_str(&self.plan_human(&report.plan));
                    output.push('\n');
                    output.push_str(&steps_human(report.execution.results()));
                    output.push_str(&format!("{}\n\n", RULE));
                }
                output.push_str(&answer_human(&report.answer));
                Ok(output)
            }
        }
    }

    pub fn format_answer(&self, answer: &FinalAnswer) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(answer_human(answer)),
            _ => self.serialize(answer, "answer"),
        }
    }

    pub fn format_plan(&self, plan: &Plan) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.plan_human(plan)),
            _ => self.serialize(plan, "plan"),
        }
    }

    pub fn format_tools(&self, specs: &[&ToolSpec]) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(tools_human(specs)),
            _ => {
                let tools: Vec<Value> = specs
                    .iter()
                    .map(|spec| {
                        json!({
                            "name": spec.name,
                            "description": spec.description,
                            "parameters": spec.schema(),
                        })
                    })
                    .collect();
                self.serialize(&tools, "tool list")
            }
        }
    }

    pub fn format_config(&self, config: &AiopsConfig) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(config.to_string()),
            _ => {
                let map: std::collections::BTreeMap<_, _> =
                    config.to_display_map().into_iter().collect();
                self.serialize(&map, "config")
            }
        }
    }

    fn serialize<T: Serialize + ?Sized>(&self, value: &T, what: &str) -> Result<String> {
        match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(value)
                .with_context(|| format!("Failed to serialize {} to YAML", what)),
            _ => serde_json::to_string_pretty(value)
                .with_context(|| format!("Failed to serialize {} to JSON", what)),
        }
    }

    fn plan_human(&self, plan: &Plan) -> String {
        let mut output = format!("Plan for: {}\n", plan.query());
        for (i, step) in plan.steps().iter().enumerate() {
            let connector = if i + 1 == plan.len() {
                "\u{2514}\u{2500}"
            } else {
                "\u{251C}\u{2500}"
            };
            let params: Vec<String> = step
                .parameters
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => format!("{}={}", k, s),
                    other => format!("{}={}", k, other),
                })
                .collect();
            output.push_str(&format!(
                "{} {}. {}({}) - {}\n",
                connector,
                step.step_index + 1,
                step.tool_name,
                params.join(", "),
                step.action
            ));
        }
        if let Some(expected) = plan.expected_output() {
            output.push_str(&format!("Expected: {}\n", expected));
        }
        output
    }
}

fn steps_human(results: &[StepResult]) -> String {
    let mut output = String::from("Steps:\n");
    for result in results {
        let attempts = if result.attempt_count == 1 {
            "1 attempt".to_string()
        } else {
            format!("{} attempts", result.attempt_count)
        };
        if result.is_success() {
            output.push_str(&format!(
                "  \u{2713} {} ({}, {}ms)\n",
                result.tool_name,
                attempts,
                result.elapsed.as_millis()
            ));
        } else {
            output.push_str(&format!(
                "  \u{2717} {} ({}): {}\n",
                result.tool_name,
                attempts,
                result.error_message()
            ));
        }
    }
    output
}

fn answer_human(answer: &FinalAnswer) -> String {
    let mut output = String::new();
    output.push_str(answer.text.trim_end());
    output.push('\n');

    if !answer.complete {
        output.push_str("\n\u{26A0} Incomplete answer\n");
        if !answer.missing_info.is_empty() {
            output.push_str("Missing:\n");
            for item in &answer.missing_info {
                output.push_str(&format!("  - {}\n", item));
            }
        }
    }

    if !answer.suggestions.is_empty() {
        output.push_str("\nSuggestions:\n");
        for suggestion in &answer.suggestions {
            output.push_str(&format!("  - {}\n", suggestion));
        }
    }
    output
}

fn tools_human(specs: &[&ToolSpec]) -> String {
    let mut output = format!("Available tools ({})\n{}\n\n", specs.len(), RULE);
    for spec in specs {
        output.push_str(&format!("{}\n  {}\n", spec.name, spec.description));
        if spec.params.is_empty() {
            output.push_str("  (no parameters)\n");
        }
        for (i, param) in spec.params.iter().enumerate() {
            let connector = if i + 1 == spec.params.len() {
                "\u{2514}\u{2500}"
            } else {
                "\u{251C}\u{2500}"
            };
            let required = if param.required { ", required" } else { "" };
            output.push_str(&format!(
                "  {} {} ({}{}): {}\n",
                connector, param.name, param.param_type, required, param.description
            ));
        }
        output.push('\n');
    }
    output
}
