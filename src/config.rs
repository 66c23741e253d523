//! Configuration management for aiops
//!
//! Settings are loaded from environment variables with sensible defaults. The
//! binary loads a `.env` file first (via `dotenvy`), so everything below can
//! also live there.
//!
//! # Environment Variables
//!
//! ## Aiops Configuration
//! - `AIOPS_PROVIDER`: genai adapter (groq|openai|anthropic|gemini|xai|ollama|...) - default: "groq"
//! - `AIOPS_MODEL`: Model name - default: "llama-3.3-70b-versatile" for Groq
//! - `AIOPS_REQUEST_TIMEOUT`: LLM timeout in seconds - default: "30"
//! - `AIOPS_TOOL_TIMEOUT`: Per tool call timeout in seconds - default: "30"
//! - `AIOPS_MAX_ATTEMPTS`: Attempts per step for transient failures - default: "3"
//! - `AIOPS_BACKOFF_BASE_MS`: First backoff delay in milliseconds - default: "1000"
//! - `AIOPS_CACHE_TTL`: Tool response cache lifetime in seconds - default: "300"
//! - `AIOPS_VERIFIER_FALLBACK`: Render payloads without the LLM when verification fails - default: "false"
//! - `AIOPS_LOG_LEVEL`: Logging level - default: "info"
//!
//! ## Tool Credentials and Endpoints
//! - `OPENWEATHER_API_KEY`: OpenWeatherMap key (weather tools)
//! - `NEWS_API_KEY`: NewsAPI key (news tools)
//! - `AIOPS_OPENWEATHER_URL`, `AIOPS_NEWS_URL`, `AIOPS_JOKES_URL`: base URL overrides
//!
//! ## GenAI Provider Configuration
//! Provider credentials are read directly by the genai library:
//! `GROQ_API_KEY`, `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `GEMINI_API_KEY`, `XAI_API_KEY`.
//!
//! # Example
//!
//! ```no_run
//! use aiops::AiopsConfig;
//!
//! let config = AiopsConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use genai::adapter::AdapterKind;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PROVIDER: AdapterKind = AdapterKind::Groq;
const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_BASE_MS: u64 = 1000;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_VERIFIER_FALLBACK: bool = false;

pub const DEFAULT_OPENWEATHER_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_NEWS_URL: &str = "https://newsapi.org/v2";
pub const DEFAULT_JOKES_URL: &str = "https://icanhazdadjoke.com";

const MAX_TIMEOUT_SECS: u64 = 600;
const MAX_ATTEMPTS_LIMIT: u32 = 10;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid provider name
    #[error("Invalid provider: {0}. Valid options: groq, openai, anthropic, gemini, xai, ollama")]
    InvalidProvider(String),

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Main configuration structure for aiops
#[derive(Debug, Clone)]
pub struct AiopsConfig {
    /// LLM provider (from genai)
    pub provider: AdapterKind,

    /// Model name to use for planning and verification
    pub model: String,

    /// LLM request timeout in seconds
    pub request_timeout_secs: u64,

    /// Timeout applied to every single tool call
    pub tool_timeout_secs: u64,

    /// Total attempts per step for transient failures
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles afterwards
    pub backoff_base_ms: u64,

    /// Lifetime of cached tool responses
    pub cache_ttl_secs: u64,

    /// Render payloads deterministically when the verifier LLM fails
    pub verifier_fallback: bool,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    pub openweather_api_key: Option<String>,
    pub news_api_key: Option<String>,

    pub openweather_url: String,
    pub news_url: String,
    pub jokes_url: String,
}

impl Default for AiopsConfig {
    /// Loads the configuration from `AIOPS_*` variables, falling back to defaults
    fn default() -> Self {
        let provider = env::var("AIOPS_PROVIDER")
            .ok()
            .and_then(|s| AdapterKind::from_lower_str(&s.to_lowercase()))
            .unwrap_or(DEFAULT_PROVIDER);

        let model = env::var("AIOPS_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_model_for(provider).to_string());

        let request_timeout_secs = parse_env("AIOPS_REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT_SECS);
        let tool_timeout_secs = parse_env("AIOPS_TOOL_TIMEOUT", DEFAULT_TOOL_TIMEOUT_SECS);
        let max_attempts = parse_env("AIOPS_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS);
        let backoff_base_ms = parse_env("AIOPS_BACKOFF_BASE_MS", DEFAULT_BACKOFF_BASE_MS);
        let cache_ttl_secs = parse_env("AIOPS_CACHE_TTL", DEFAULT_CACHE_TTL_SECS);
        let verifier_fallback = parse_env("AIOPS_VERIFIER_FALLBACK", DEFAULT_VERIFIER_FALLBACK);

        let log_level = env::var("AIOPS_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            provider,
            model,
            request_timeout_secs,
            tool_timeout_secs,
            max_attempts,
            backoff_base_ms,
            cache_ttl_secs,
            verifier_fallback,
            log_level,
            openweather_api_key: api_key_from_env("OPENWEATHER_API_KEY"),
            news_api_key: api_key_from_env("NEWS_API_KEY"),
            openweather_url: url_from_env("AIOPS_OPENWEATHER_URL", DEFAULT_OPENWEATHER_URL),
            news_url: url_from_env("AIOPS_NEWS_URL", DEFAULT_NEWS_URL),
            jokes_url: url_from_env("AIOPS_JOKES_URL", DEFAULT_JOKES_URL),
        }
    }
}

pub fn default_model_for(provider: AdapterKind) -> &'static str {
    match provider {
        AdapterKind::Groq => DEFAULT_GROQ_MODEL,
        AdapterKind::OpenAI => "gpt-4o-mini",
        AdapterKind::Anthropic => "claude-3-5-haiku-latest",
        AdapterKind::Gemini => "gemini-2.0-flash",
        AdapterKind::Xai => "grok-3-mini",
        AdapterKind::Ollama => "llama3.2",
        _ => DEFAULT_GROQ_MODEL,
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn url_from_env(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Reads an API key, treating blanks and `your_..._here` templates as unset
pub fn api_key_from_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !is_placeholder_key(v))
}

pub fn is_placeholder_key(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || (value.starts_with("your_") && value.ends_with("_here"))
}

fn mask_secret(secret: &Option<String>) -> String {
    match secret {
        Some(s) if s.chars().count() > 4 => format!("{}****", s.chars().take(4).collect::<String>()),
        Some(_) => "****".to_string(),
        None => "(not set)".to_string(),
    }
}

impl AiopsConfig {
    /// Parses a provider name the same way `AIOPS_PROVIDER` is parsed
    pub fn parse_provider(name: &str) -> Result<AdapterKind, ConfigError> {
        AdapterKind::from_lower_str(&name.to_lowercase())
            .ok_or_else(|| ConfigError::InvalidProvider(name.to_string()))
    }

    /// Validates the configuration
    ///
    /// Timeouts must be within 1..=600 seconds, attempts within 1..=10 and
    /// the log level one of trace, debug, info, warn, error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("Request timeout", self.request_timeout_secs),
            ("Tool timeout", self.tool_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} must be at least 1 second",
                    name
                )));
            }
            if value > MAX_TIMEOUT_SECS {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} cannot exceed 10 minutes",
                    name
                )));
            }
        }

        if self.max_attempts == 0 || self.max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(ConfigError::ValidationFailed(format!(
                "Max attempts must be between 1 and {}",
                MAX_ATTEMPTS_LIMIT
            )));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Model name cannot be empty".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Converts configuration to a display map for output formatting
    ///
    /// API keys are masked.
    pub fn to_display_map(&self) -> std::collections::HashMap<String, String> {
        let mut map = std::collections::HashMap::new();

        map.insert("provider".to_string(), self.provider.as_str().to_string());
        map.insert("model".to_string(), self.model.clone());
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert(
            "tool_timeout_secs".to_string(),
            self.tool_timeout_secs.to_string(),
        );
        map.insert("max_attempts".to_string(), self.max_attempts.to_string());
        map.insert(
            "backoff_base_ms".to_string(),
            self.backoff_base_ms.to_string(),
        );
        map.insert("cache_ttl_secs".to_string(), self.cache_ttl_secs.to_string());
        map.insert(
            "verifier_fallback".to_string(),
            self.verifier_fallback.to_string(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());
        map.insert(
            "openweather_api_key".to_string(),
            mask_secret(&self.openweather_api_key),
        );
        map.insert("news_api_key".to_string(), mask_secret(&self.news_api_key));

        map
    }
}

impl fmt::Display for AiopsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Aiops Configuration:")?;
        writeln!(f, "  Provider: {}", self.provider.as_str())?;
        writeln!(f, "  Model: {}", self.model)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Tool Timeout: {}s", self.tool_timeout_secs)?;
        writeln!(
            f,
            "  Retry: {} attempts, {}ms base delay",
            self.max_attempts, self.backoff_base_ms
        )?;
        writeln!(f, "  Cache TTL: {}s", self.cache_ttl_secs)?;
        writeln!(f, "  Verifier Fallback: {}", self.verifier_fallback)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        writeln!(
            f,
            "  OpenWeather Key: {}",
            mask_secret(&self.openweather_api_key)
        )?;
        writeln!(f, "  News Key: {}", mask_secret(&self.news_api_key))?;
        Ok(())
    }
}
