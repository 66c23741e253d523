//! aiops - AI operations assistant
//!
//! Answers natural-language requests ("weather in Noida and a joke about
//! dreams") by letting an LLM plan a sequence of tool calls, executing the
//! calls against external APIs with bounded retries, and letting the LLM verify
//! and format what came back.
//!
//! # Core Concepts
//!
//! - **Tools**: adapters for OpenWeatherMap, NewsAPI and icanhazdadjoke, each
//!   described by a [`ToolSpec`] and registered once in a [`ToolRegistry`]
//! - **Planner**: turns a query into a validated [`Plan`]
//! - **Executor**: runs plan steps in order, retrying transient failures
//! - **Verifier**: checks the results and produces a [`FinalAnswer`]
//! - **Assistant**: composes the three with at most one retry cycle
//!
//! # Example Usage
//!
//! ```no_run
//! use aiops::{AiopsConfig, Assistant};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AiopsConfig::default();
//! let assistant = Assistant::from_config(&config)?;
//!
//! let answer = assistant.handle_query("Tell me a random joke.").await?;
//! println!("{}", answer.text);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod llm;
pub mod pipeline;
pub mod progress;
pub mod tools;
pub mod util;

pub use config::{AiopsConfig, ConfigError};
pub use llm::{LLMClient, LlmError, MockLLMClient, MockResponse};
pub use pipeline::{
    Assistant, AssistantError, ExecutionError, ExecutionResult, ExecutionStatus, Executor,
    FinalAnswer, Plan, PlanStep, Planner, PlanningError, QueryReport, RetryDirective,
    RetryPolicy, StepResult, Verification, Verifier, VerifierError,
};
pub use tools::{Tool, ToolError, ToolRegistry, ToolSpec};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
