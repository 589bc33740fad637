//! Ollama local LLM provider implementation
//!
//! Talks to the `/api/generate` endpoint of a local Ollama server. The
//! prompt is already a complete transcript ending at the `AI:` cursor, so
//! the completion endpoint is used rather than the chat one.
//!
//! # Features
//!
//! - Local inference (no data leaves the machine)
//! - Streaming response handling
//! - Token usage tracking with estimation fallback
//! - Connection error handling with helpful suggestions
//!
//! # Example
//!
//! ```rust,no_run
//! use azalea::providers::{OllamaConfig, OllamaProvider};
//!
//! let config = OllamaConfig::new().with_model("llama3.2");
//! let provider = OllamaProvider::try_new(config).unwrap();
//! ```

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::providers::{GenerationRequest, LlmProvider, LlmResponse, ProviderError};

/// Configuration for the Ollama provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
    /// Model to use
    #[serde(default = "default_ollama_model")]
    pub default_model: String,
    /// HTTP timeout in seconds; local generation of 1024 tokens can be slow
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Additional model options merged into every request
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

fn default_timeout() -> u64 {
    300
}

impl OllamaConfig {
    /// Creates a new Ollama configuration with default settings
    pub fn new() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            default_model: default_ollama_model(),
            timeout_seconds: default_timeout(),
            options: HashMap::new(),
        }
    }

    /// Sets a custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Sets the timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Adds a model option (e.g. `num_ctx`)
    pub fn with_option(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.base_url.is_empty() {
            return Err(ProviderError::config("Ollama base URL cannot be empty"));
        }

        if self.default_model.is_empty() {
            return Err(ProviderError::config("Ollama model cannot be empty"));
        }

        if self.timeout_seconds == 0 {
            return Err(ProviderError::config("Ollama timeout must be positive"));
        }

        Ok(())
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Ollama `/api/generate` request body
#[derive(Debug, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    system: String,
    stream: bool,
    options: serde_json::Map<String, serde_json::Value>,
}

/// Ollama streaming response chunk
#[derive(Debug, Deserialize)]
struct OllamaGenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    /// Prompt evaluation count (only in final chunk)
    prompt_eval_count: Option<u32>,
    /// Evaluation count (completion tokens, only in final chunk)
    eval_count: Option<u32>,
    /// Error reported mid-stream
    error: Option<String>,
}

/// Accumulated response from streaming
#[derive(Debug, Default)]
struct AccumulatedResponse {
    content: String,
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    done: bool,
}

/// Reassembles NDJSON lines that arrive split across network chunks
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Appends `chunk` and drains every complete (newline-terminated) line
    fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);
        complete
            .split(|&b| b == b'\n')
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .map(Bytes::copy_from_slice)
            .collect()
    }

    /// Whatever trails the last newline once the stream has ended
    fn finish(self) -> Option<Bytes> {
        if self.pending.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(Bytes::from(self.pending))
        }
    }
}

/// Ollama provider implementation
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    config: OllamaConfig,
    client: Client,
}

impl OllamaProvider {
    /// Creates a new Ollama provider, returning an error if the config is
    /// invalid or the HTTP client cannot be built
    pub fn try_new(config: OllamaConfig) -> Result<Self, ProviderError> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Builds the request body, letting per-request sampling parameters
    /// win over configured options
    fn build_request(&self, request: GenerationRequest) -> OllamaGenerateRequest {
        let mut options: serde_json::Map<String, serde_json::Value> = self
            .config
            .options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        options.insert(
            "temperature".to_string(),
            serde_json::json!(request.temperature),
        );
        options.insert(
            "num_predict".to_string(),
            serde_json::json!(request.max_tokens),
        );

        OllamaGenerateRequest {
            model: self.config.default_model.clone(),
            prompt: request.prompt,
            system: request.system_prompt,
            stream: true,
            options,
        }
    }

    /// Parses a single NDJSON line from the stream
    fn parse_chunk(&self, chunk: &Bytes) -> Result<OllamaGenerateChunk, ProviderError> {
        let text = String::from_utf8_lossy(chunk);

        if text.trim().is_empty() {
            return Err(ProviderError::serialization("Empty response chunk"));
        }

        serde_json::from_str(&text).map_err(|e| {
            ProviderError::serialization(format!("Failed to parse response chunk: {}", e))
        })
    }

    fn accumulate_chunk(
        &self,
        acc: &mut AccumulatedResponse,
        chunk: OllamaGenerateChunk,
    ) -> Result<(), ProviderError> {
        if let Some(error) = chunk.error {
            return Err(ProviderError::provider(error, None::<String>));
        }

        acc.content.push_str(&chunk.response);

        if chunk.done {
            acc.done = true;
            acc.prompt_tokens = chunk.prompt_eval_count;
            acc.completion_tokens = chunk.eval_count;
        }

        Ok(())
    }

    /// Parses one complete line; unparseable lines are logged and skipped
    fn consume_line(&self, acc: &mut AccumulatedResponse, line: &Bytes) -> Result<(), ProviderError> {
        match self.parse_chunk(line) {
            Ok(parsed) => self.accumulate_chunk(acc, parsed),
            Err(e) => {
                warn!(error = %e, line = %String::from_utf8_lossy(line), "Failed to parse chunk");
                Ok(())
            }
        }
    }

    /// Estimates token count from character count (4 chars ≈ 1 token)
    fn estimate_tokens(&self, text: &str) -> u32 {
        (text.len() as f32 / 4.0).ceil() as u32
    }

    /// Converts an unsuccessful HTTP status into a ProviderError
    fn handle_http_error(&self, status: StatusCode, body: Option<String>) -> ProviderError {
        let message = body.unwrap_or_else(|| "Unknown error".to_string());

        match status {
            StatusCode::NOT_FOUND => ProviderError::model_not_found(&self.config.default_model),
            StatusCode::BAD_REQUEST => ProviderError::invalid_request(message),
            status if status.is_server_error() => ProviderError::provider(
                format!("Ollama server error: {}", message),
                Some(status.as_u16().to_string()),
            ),
            _ => ProviderError::network(format!("HTTP error {}: {}", status, message)),
        }
    }

    /// Handles connection errors with helpful suggestions
    fn handle_connection_error(&self, err: &reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            return ProviderError::timeout(self.config.timeout_seconds);
        }

        let message = if err.is_connect() {
            format!(
                "Cannot connect to Ollama at {}. Is Ollama running? Start it with: ollama serve",
                self.config.base_url
            )
        } else {
            format!("Network error: {}", err)
        };

        ProviderError::network(message)
    }
}

#[async_trait::async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<LlmResponse, ProviderError> {
        info!(
            model = %self.config.default_model,
            prompt_length = request.prompt.len(),
            temperature = request.temperature,
            "Sending generation request to Ollama"
        );

        let body = self.build_request(request);
        let url = format!("{}/api/generate", self.config.base_url.trim_end_matches('/'));

        debug!(url = %url, "Making Ollama API request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.handle_connection_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.ok();
            return Err(self.handle_http_error(status, text));
        }

        let mut accumulated = AccumulatedResponse::default();
        let mut lines = LineBuffer::default();
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(e) if e.is_timeout() => {
                    return Err(ProviderError::timeout(self.config.timeout_seconds));
                }
                Err(e) => return Err(ProviderError::network(format!("Stream error: {}", e))),
            };

            for line in lines.push(&chunk) {
                self.consume_line(&mut accumulated, &line)?;
            }
        }

        if let Some(line) = lines.finish() {
            self.consume_line(&mut accumulated, &line)?;
        }

        if !accumulated.done {
            warn!("Ollama stream ended without done=true flag. Response may be incomplete.");
        }

        let content = accumulated.content.trim().to_string();
        if content.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        let prompt_tokens = accumulated
            .prompt_tokens
            .unwrap_or_else(|| self.estimate_tokens(&body.system) + self.estimate_tokens(&body.prompt));
        let completion_tokens = accumulated
            .completion_tokens
            .unwrap_or_else(|| self.estimate_tokens(&content));

        info!(
            prompt_tokens,
            completion_tokens,
            total_tokens = prompt_tokens + completion_tokens,
            "Ollama token usage"
        );

        Ok(LlmResponse::new(content).with_tokens(prompt_tokens, completion_tokens))
    }

    fn default_model(&self) -> String {
        self.config.default_model.clone()
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }
}
