//! LLM client abstraction layer
//!
//! This module provides a trait-based abstraction for LLM communication,
//! allowing the genai-backed client and the scripted mock to be used
//! interchangeably. Planner and verifier only ever call
//! [`complete_json`].

mod client;
mod error;
mod genai;
mod mock;
mod selector;
mod structured;
mod types;

pub use client::LLMClient;
pub use error::LlmError;
pub use self::genai::GenAIClient;
pub use mock::{MockLLMClient, MockResponse};
pub use selector::{select_llm_client, SelectedClient};
pub use structured::complete_json;
pub use types::{ChatMessage, LLMRequest, LLMResponse, MessageRole, ResponseFormat};
