//! LLM client module
//!
//! Provides the text-generation backend used for plan generation and
//! free-form chat.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod ollama;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use ollama::OllamaClient;
pub use types::{
    ChatMessage, CompletionRequest, CompletionResponse, MessageRole, ResponseFormat, StreamChunk, TokenUsage,
};

use crate::config::LlmConfig;

/// Create an LLM client based on the provider specified in config
///
/// Currently only the "ollama" provider is supported; the factory is the
/// seam for adding others.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaClient::from_config(config)?)),
        other => Err(LlmError::InvalidResponse(format!(
            "Unknown LLM provider: '{}'. Supported: ollama",
            other
        ))),
    }
}
