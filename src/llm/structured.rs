//! Structured (JSON) completions on top of [`LLMClient`]
//!
//! Planner and verifier both talk to the model through [`complete_json`]: a
//! system prompt, a user prompt and the name of the expected document shape.
//! The reply must be a JSON object; markdown code fences are tolerated because
//! some providers add them even in JSON mode.

use super::client::LLMClient;
use super::error::LlmError;
use super::types::{ChatMessage, LLMRequest};
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::debug;

const STRUCTURED_TEMPERATURE: f32 = 0.2;
const STRUCTURED_MAX_TOKENS: u32 = 4096;

pub(crate) fn extract_json_from_markdown(content: &str) -> &str {
    let trimmed = content.trim();

    if let Some(start_idx) = trimmed.find("```json") {
        let after_fence = &trimmed[start_idx + 7..];
        if let Some(end_idx) = after_fence.find("```") {
            return after_fence[..end_idx].trim();
        }
    }

    if let Some(start_idx) = trimmed.find("```") {
        let after_fence = &trimmed[start_idx + 3..];
        if let Some(end_idx) = after_fence.find("```") {
            return after_fence[..end_idx].trim();
        }
    }

    trimmed
}

/// Requests a JSON object from the model and decodes it into `T`
///
/// `schema_hint` names the expected document (e.g. `"plan"`) and only shows up
/// in logs and error messages; the actual shape is described in the prompts.
pub async fn complete_json<T: DeserializeOwned>(
    client: &dyn LLMClient,
    system_prompt: &str,
    user_prompt: &str,
    schema_hint: &str,
) -> Result<T, LlmError> {
    let start = Instant::now();

    let request = LLMRequest::new(vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(user_prompt),
    ])
    .with_temperature(STRUCTURED_TEMPERATURE)
    .with_max_tokens(STRUCTURED_MAX_TOKENS)
    .json_mode();

    let response = client.chat(request).await?;

    debug!(
        schema = schema_hint,
        client = client.name(),
        latency_ms = start.elapsed().as_millis() as u64,
        response_len = response.content.len(),
        "Structured completion received"
    );

    let json_content = extract_json_from_markdown(&response.content);
    serde_json::from_str(json_content).map_err(|e| {
        LlmError::invalid_json(
            format!("failed to parse {} response: {}", schema_hint, e),
            response.content.clone(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLLMClient, MockResponse, ResponseFormat};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        answer: u32,
    }

    #[test]
    fn test_extract_plain_json() {
        assert_eq!(extract_json_from_markdown("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_json_fence() {
        let content = "Here you go:\n```json\n{\"a\": 1}\n```\nThanks";
        assert_eq!(extract_json_from_markdown(content), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_bare_fence() {
        let content = "```\n{\"a\": 2}\n```";
        assert_eq!(extract_json_from_markdown(content), "{\"a\": 2}");
    }

    #[tokio::test]
    async fn test_complete_json_parses_response() {
        let client = MockLLMClient::new();
        client.add_response(MockResponse::text("{\"answer\": 42}"));

        let parsed: Sample = complete_json(&client, "system", "user", "sample")
            .await
            .unwrap();
        assert_eq!(parsed, Sample { answer: 42 });

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].response_format, ResponseFormat::Json);
        assert_eq!(requests[0].system_prompt(), Some("system"));
        assert_eq!(requests[0].user_prompt(), Some("user"));
    }

    #[tokio::test]
    async fn test_complete_json_malformed() {
        let client = MockLLMClient::new();
        client.add_response(MockResponse::text("this is not json"));

        let result: Result<Sample, _> = complete_json(&client, "s", "u", "sample").await;
        match result {
            Err(LlmError::InvalidJson {
                message,
                raw_response,
            }) => {
                assert!(message.contains("sample"));
                assert_eq!(raw_response.as_deref(), Some("this is not json"));
            }
            other => panic!("expected InvalidJson, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_complete_json_propagates_transport_error() {
        let client = MockLLMClient::new();
        client.add_response(MockResponse::error(LlmError::TimeoutError { seconds: 30 }));

        let result: Result<Sample, _> = complete_json(&client, "s", "u", "sample").await;
        assert_eq!(result.unwrap_err(), LlmError::TimeoutError { seconds: 30 });
    }
}
