//! GenAI-based LLM client implementation
//!
//! This module provides an LLM client implementation using the `genai` crate,
//! supporting multiple providers (Groq, OpenAI, Claude, Gemini, Grok, Ollama).

use super::client::LLMClient;
use super::error::LlmError;
use super::types::{ChatMessage, LLMRequest, LLMResponse, MessageRole, ResponseFormat};
use async_trait::async_trait;
use genai::adapter::AdapterKind;
use genai::chat::{
    ChatMessage as GenAIChatMessage, ChatOptions, ChatRequest as GenAIChatRequest,
    ChatResponseFormat,
};
use genai::resolver::{AuthData, Endpoint, ServiceTargetResolver};
use genai::{Client, ModelIden, ServiceTarget};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// GenAI-based LLM client supporting multiple providers
pub struct GenAIClient {
    client: Client,
    model: String,
    provider: AdapterKind,
    timeout: Duration,
}

impl GenAIClient {
    /// Creates a new GenAI client pinned to `provider`
    ///
    /// The model name is always routed to `provider`, even when genai would
    /// infer a different adapter from the name alone. `AIOPS_API_BASE_URL`
    /// overrides the provider endpoint.
    pub fn new(provider: AdapterKind, model: String, timeout: Duration) -> Self {
        let custom_endpoint = std::env::var("AIOPS_API_BASE_URL").ok();

        let mut builder = Client::builder().with_model_mapper_fn(
            move |model_iden: ModelIden| -> Result<ModelIden, genai::resolver::Error> {
                Ok(ModelIden::new(provider, model_iden.model_name))
            },
        );

        if let Some(endpoint_url) = custom_endpoint {
            debug!(
                "Using custom endpoint for {}: {}",
                provider.as_str(),
                endpoint_url
            );

            let model_clone = model.clone();
            let resolver = ServiceTargetResolver::from_resolver_fn(
                move |_service_target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error>
                {
                    let endpoint = Endpoint::from_owned(endpoint_url.clone());

                    let auth = match provider.default_key_env_name() {
                        Some(api_key_var) => AuthData::from_env(api_key_var),
                        None => AuthData::from_single(""),
                    };

                    Ok(ServiceTarget {
                        endpoint,
                        auth,
                        model: ModelIden::new(provider, &model_clone),
                    })
                },
            );
            builder = builder.with_service_target_resolver(resolver);
        }

        debug!(
            "Creating GenAI client: provider={}, model={}",
            provider.as_str(),
            model,
        );

        Self {
            client: builder.build(),
            model,
            provider,
            timeout,
        }
    }

    fn convert_message(msg: &ChatMessage) -> GenAIChatMessage {
        match msg.role {
            MessageRole::System => GenAIChatMessage::system(&msg.content),
            MessageRole::User => GenAIChatMessage::user(&msg.content),
            MessageRole::Assistant => GenAIChatMessage::assistant(&msg.content),
        }
    }

    fn options_for(request: &LLMRequest) -> ChatOptions {
        let mut options = ChatOptions::default();
        if let Some(temp) = request.temperature {
            options = options.with_temperature(temp as f64);
        }
        if let Some(max_tokens) = request.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }
        if request.response_format == ResponseFormat::Json {
            options = options.with_response_format(ChatResponseFormat::JsonMode);
        }
        options
    }
}

/// Maps a provider failure message onto the closest [`LlmError`] variant
fn classify_provider_error(provider: &str, message: String) -> LlmError {
    let lower = message.to_lowercase();
    if lower.contains("401") || lower.contains("unauthorized") || lower.contains("api key") {
        LlmError::AuthenticationError { message }
    } else if lower.contains("429") || lower.contains("rate limit") {
        LlmError::RateLimitError { retry_after: None }
    } else if lower.contains("connect") || lower.contains("dns") {
        LlmError::NetworkError { message }
    } else {
        LlmError::ApiError {
            message: format!("{} request failed: {}", provider, message),
            status_code: None,
        }
    }
}

#[async_trait]
impl LLMClient for GenAIClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, LlmError> {
        let start = Instant::now();

        let messages: Vec<GenAIChatMessage> =
            request.messages.iter().map(Self::convert_message).collect();
        let genai_request = GenAIChatRequest::new(messages);
        let options = Self::options_for(&request);

        let response = match tokio::time::timeout(
            self.timeout,
            self.client
                .exec_chat(&self.model, genai_request, Some(&options)),
        )
        .await
        {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                error!("{} API error: {}", self.provider.as_str(), e);
                return Err(classify_provider_error(self.provider.as_str(), e.to_string()));
            }
            Err(_) => {
                error!(
                    "{} request timed out after {}s",
                    self.provider.as_str(),
                    self.timeout.as_secs()
                );
                return Err(LlmError::TimeoutError {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let content = response.first_text().unwrap_or_default().to_string();

        Ok(LLMResponse::text(content, start.elapsed()))
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }

    fn model_info(&self) -> Option<String> {
        Some(self.model.clone())
    }
}

impl std::fmt::Debug for GenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAIClient")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}
