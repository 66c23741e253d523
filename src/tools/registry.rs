//! Tool registry
//!
//! Immutable name → tool mapping built once at startup and shared through an
//! `Arc`. The planner reads the specs, the executor dispatches through it.

use std::sync::Arc;
use thiserror::Error;

use super::cache::ToolCache;
use super::http::ApiClient;
use super::jokes::{JokeSearchTool, RandomJokeTool};
use super::news::{NewsHeadlinesTool, NewsSearchTool, NewsService};
use super::spec::ToolSpec;
use super::trait_def::Tool;
use super::weather::{OpenWeatherService, WeatherCoordinatesTool, WeatherTool};
use crate::config::AiopsConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Tool '{0}' is registered more than once")]
    DuplicateTool(String),

    #[error("Tool names must be non-empty lowercase identifiers, got '{0}'")]
    InvalidName(String),
}

/// Registry of all available tools, in registration order
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Builds a registry, rejecting duplicate or malformed names
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self, RegistryError> {
        let mut seen: Vec<&str> = Vec::with_capacity(tools.len());
        for tool in &tools {
            let name = tool.name();
            let well_formed = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
            if !well_formed {
                return Err(RegistryError::InvalidName(name.to_string()));
            }
            if seen.contains(&name) {
                return Err(RegistryError::DuplicateTool(name.to_string()));
            }
            seen.push(name);
        }

        Ok(Self { tools })
    }

    /// Weather, news and jokes tools wired from configuration
    pub fn with_defaults(config: &AiopsConfig) -> Self {
        let cache = || ToolCache::new(config.cache_ttl());
        let timeout = config.tool_timeout();

        let weather = Arc::new(OpenWeatherService::new(
            ApiClient::new("OpenWeatherMap", &config.openweather_url, timeout, cache()),
            config.openweather_api_key.clone(),
        ));
        let news = Arc::new(NewsService::new(
            ApiClient::new("NewsAPI", &config.news_url, timeout, cache()),
            config.news_api_key.clone(),
        ));
        let jokes = Arc::new(ApiClient::new(
            "icanhazdadjoke",
            &config.jokes_url,
            timeout,
            cache(),
        ));

        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(WeatherTool::new(Arc::clone(&weather))),
            Arc::new(WeatherCoordinatesTool::new(weather)),
            Arc::new(NewsSearchTool::new(Arc::clone(&news))),
            Arc::new(NewsHeadlinesTool::new(news)),
            Arc::new(RandomJokeTool::new(Arc::clone(&jokes))),
            Arc::new(JokeSearchTool::new(jokes)),
        ];

        Self { tools }
    }

    /// Get a tool by exact name
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn get_spec(&self, name: &str) -> Option<&ToolSpec> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.spec())
    }

    /// Case-insensitive lookup returning the canonical registered name
    pub fn resolve(&self, name: &str) -> Option<&str> {
        let wanted = name.trim().to_lowercase();
        self.tools
            .iter()
            .map(|t| t.name())
            .find(|n| *n == wanted)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_spec(name).is_some()
    }

    pub fn specs(&self) -> Vec<&ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// Get all registered tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}
