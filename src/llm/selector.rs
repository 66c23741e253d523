use crate::config::AiopsConfig;
use crate::llm::{GenAIClient, LLMClient, LlmError};
use genai::adapter::AdapterKind;
use std::sync::Arc;
use tracing::{debug, info};

pub struct SelectedClient {
    pub client: Arc<dyn LLMClient>,
    pub provider: AdapterKind,
    pub description: String,
}

impl std::fmt::Debug for SelectedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedClient")
            .field("provider", &self.provider)
            .field("description", &self.description)
            .finish()
    }
}

/// Builds the configured LLM client after checking its credentials
pub fn select_llm_client(config: &AiopsConfig) -> Result<SelectedClient, LlmError> {
    let provider = config.provider;

    if let Some(env_var) = missing_credentials(provider) {
        return Err(LlmError::ConfigurationError {
            message: format!(
                "No credentials for {}. Set {} (or choose another provider with AIOPS_PROVIDER)",
                provider.as_str(),
                env_var
            ),
        });
    }
    debug!("Credentials found for {}", provider.as_str());

    let client = GenAIClient::new(provider, config.model.clone(), config.request_timeout());
    info!("Using LLM provider: {} ({})", provider.as_str(), config.model);

    Ok(SelectedClient {
        client: Arc::new(client),
        provider,
        description: format!("{} ({})", provider.as_str(), config.model),
    })
}

/// Name of the unset API key variable, if the provider needs one
fn missing_credentials(provider: AdapterKind) -> Option<&'static str> {
    let env_var = provider.default_key_env_name()?;
    match std::env::var(env_var) {
        Ok(value) if !crate::config::is_placeholder_key(&value) => None,
        _ => Some(env_var),
    }
}
