//! Prompt construction for the planner and verifier
//!
//! Prompts are pure functions of their inputs: identical registries and
//! results give byte-identical prompts.

use super::types::{ExecutionResult, StepResult};
use crate::tools::ToolRegistry;
use serde_json::{json, Value};

pub fn planner_system_prompt(registry: &ToolRegistry) -> String {
    let mut tools = String::new();
    for (i, spec) in registry.specs().iter().enumerate() {
        let schema = serde_json::to_string(&spec.schema()).unwrap_or_default();
        tools.push_str(&format!(
            "{}. \"{}\" - {}\n   Parameters: {}\n",
            i + 1,
            spec.name,
            spec.description,
            schema
        ));
    }

    format!(
        r#"You are an AI task planner. Your job is to analyze user requests and create structured execution plans.

You have access to these tools:
{tools}
IMPORTANT: You must respond with ONLY a valid JSON object in this exact format:
{{
  "task": "the original user query",
  "steps": [
    {{
      "action": "description of what this step does",
      "tool": "one of the tool names above",
      "parameters": {{"param1": "value1"}}
    }}
  ],
  "expected_output": "description of what the final result should contain"
}}

Rules:
- Identify ALL information the user asked for and create one step for each piece
- Use only the tools listed above, with their exact names
- Parameters must be concrete values taken from the request; include every required parameter
- If the request mentions multiple cities or topics, create a separate step for each
- Order the steps in the order the user asked for them"#
    )
}

pub fn planner_user_prompt(query: &str) -> String {
    format!(
        "Create an execution plan for this request:\n\n\"{}\"\n\nRespond with ONLY the JSON plan object, no other text.",
        query
    )
}

pub const VERIFIER_SYSTEM_PROMPT: &str = r#"You are a results verifier and formatter. Your job is to:
1. Check if the execution results answer the user's original question
2. Identify any missing or incomplete information
3. Format the results into a clear, user-friendly response

You must respond with ONLY a valid JSON object in this format:
{
  "is_complete": true,
  "missing_info": ["list of missing information if any"],
  "formatted_answer": "A well-formatted, comprehensive answer to the user's question using the provided results",
  "suggestions": ["any suggestions for the user if applicable"],
  "retry_steps": [0]
}

Rules:
- Use ONLY the data in the results; never invent values that are not there
- Include specific data from the results (numbers, names, descriptions)
- If a step failed, do not guess its data; mention that it is unavailable
- "retry_steps" lists the step_index values of failed steps worth trying again (empty if none)
- Format the answer with clear sections if multiple topics are covered"#;

fn successful_entry(result: &StepResult) -> Value {
    json!({
        "step_index": result.step_index,
        "tool": result.tool_name,
        "action": result.action,
        "data": result.payload,
    })
}

fn failed_entry(result: &StepResult) -> Value {
    json!({
        "step_index": result.step_index,
        "tool": result.tool_name,
        "action": result.action,
        "error": result.error_message(),
    })
}

pub fn verifier_user_prompt(query: &str, result: &ExecutionResult) -> String {
    let successful: Vec<Value> = result.successful().map(successful_entry).collect();
    let failed: Vec<Value> = result.failed().map(failed_entry).collect();

    let successful = serde_json::to_string_pretty(&successful).unwrap_or_default();
    let failed = serde_json::to_string_pretty(&failed).unwrap_or_default();

    format!(
        "Original user request: \"{}\"\n\nSuccessful results:\n{}\n\nFailed steps:\n{}\n\nVerify these results and provide a formatted answer. Respond with ONLY the JSON object.",
        query, successful, failed
    )
}
