//! Mock LLM provider for testing
//!
//! Returns a configured response or error without making network calls and
//! records every request it receives for later assertions.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::providers::{GenerationRequest, LlmProvider, LlmResponse, ProviderError};

/// Mock provider for testing
pub struct MockLlmProvider {
    response: Arc<Mutex<LlmResponse>>,
    error: Arc<Mutex<Option<ProviderError>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl MockLlmProvider {
    /// Creates a new mock provider answering "Mock response"
    pub fn new() -> Self {
        Self {
            response: Arc::new(Mutex::new(LlmResponse::new("Mock response"))),
            error: Arc::new(Mutex::new(None)),
            delay: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sets the response content to return
    pub fn set_response(&self, content: impl Into<String>) {
        *self.response.lock().unwrap() = LlmResponse::new(content);
    }

    /// Sets the error to return (instead of the response)
    pub fn set_error(&self, error: ProviderError) {
        *self.error.lock().unwrap() = Some(error);
    }

    /// Clears any set error
    pub fn clear_error(&self) {
        *self.error.lock().unwrap() = None;
    }

    /// Makes every call sleep before answering
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Returns how many times generate() was called
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Returns the most recent request
    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockLlmProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<LlmResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let error = self.error.lock().unwrap().clone();
        if let Some(err) = error {
            return Err(err);
        }

        Ok(self.response.lock().unwrap().clone())
    }

    fn default_model(&self) -> String {
        "mock-model".to_string()
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_basic() {
        let mock = MockLlmProvider::new();
        mock.set_response("Hello!");

        let response = mock
            .generate(GenerationRequest::new("User: Hi\nAI:", "s", 0.7))
            .await
            .unwrap();

        assert_eq!(response.content, "Hello!");
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.last_request().unwrap().prompt, "User: Hi\nAI:");
    }

    #[tokio::test]
    async fn test_mock_provider_error() {
        let mock = MockLlmProvider::new();
        mock.set_error(ProviderError::network("down"));

        let result = mock.generate(GenerationRequest::new("p", "s", 0.7)).await;
        assert!(matches!(result, Err(ProviderError::Network { .. })));

        mock.clear_error();
        assert!(mock.generate(GenerationRequest::new("p", "s", 0.7)).await.is_ok());
        assert_eq!(mock.call_count(), 2);
    }
}
