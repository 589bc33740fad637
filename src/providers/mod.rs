//! Inference boundary for azalea
//!
//! The bot never talks to a model directly: it hands a fully assembled
//! prompt to an `LlmProvider` and gets back either generated text or a
//! typed `ProviderError`.
//!
//! # Architecture
//!
//! - `LlmProvider` trait defines the single `generate` operation
//! - `OllamaProvider` implements it against a local Ollama server
//! - `MockLlmProvider` (tests only) returns canned responses or errors
//!
//! # Example
//!
//! ```rust,no_run
//! use azalea::providers::{GenerationRequest, LlmProvider};
//!
//! async fn example(provider: &dyn LlmProvider) {
//!     let request = GenerationRequest::new("User: hi\nAI:", "You are helpful.", 0.7);
//!     let response = provider.generate(request).await.unwrap();
//!     println!("Response: {}", response.content);
//! }
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
#[cfg(test)]
pub mod mock;
pub mod ollama;

pub use error::ProviderError;
pub use ollama::{OllamaConfig, OllamaProvider};

/// Maximum number of tokens requested per generation
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// A single completion request handed to the inference engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    /// Fully assembled prompt, ending at the `AI:` cursor
    pub prompt: String,
    /// System preamble of the active mode
    pub system_prompt: String,
    /// Sampling temperature in [0, 1]
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl GenerationRequest {
    /// Creates a request with the default token budget
    pub fn new(
        prompt: impl Into<String>,
        system_prompt: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: system_prompt.into(),
            temperature,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Overrides the token budget
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Response from the inference engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmResponse {
    /// Generated text
    pub content: String,
    /// Number of tokens in the prompt (if provided by provider)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,
    /// Number of tokens in the completion (if provided by provider)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
}

impl LlmResponse {
    /// Creates a new response with just content
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            prompt_tokens: None,
            completion_tokens: None,
        }
    }

    /// Adds token usage information
    pub fn with_tokens(mut self, prompt: u32, completion: u32) -> Self {
        self.prompt_tokens = Some(prompt);
        self.completion_tokens = Some(completion);
        self
    }

    /// Returns the total token count if available
    pub fn total_tokens(&self) -> Option<u32> {
        match (self.prompt_tokens, self.completion_tokens) {
            (Some(p), Some(c)) => Some(p + c),
            _ => None,
        }
    }
}

/// Trait for text-generation backends
///
/// All implementations must be Send + Sync so one provider can serve
/// every chat concurrently.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generates a continuation of `request.prompt`
    async fn generate(&self, request: GenerationRequest) -> Result<LlmResponse, ProviderError>;

    /// Returns the model used for generation
    fn default_model(&self) -> String;

    /// Returns the provider name, used for logging
    fn provider_name(&self) -> &'static str;
}
