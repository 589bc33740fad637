//! Error types for inference operations
//!
//! Every failure of the inference boundary is mapped onto one of these
//! variants so callers can pattern-match instead of guessing from strings.
//! None of them are retried: a failed generation is reported to the user.

use thiserror::Error;

/// Errors that can occur when asking a provider to generate text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Network-related errors (connection refused, DNS failures, broken streams)
    #[error("Network error: {message}")]
    Network {
        /// Error message
        message: String,
    },

    /// The request did not complete within the client timeout
    #[error("Request timeout after {seconds} seconds")]
    Timeout {
        /// Timeout duration in seconds
        seconds: u64,
    },

    /// The requested model is not available locally
    #[error("Model not found: {model}. Run `ollama pull {model}` to download it.")]
    ModelNotFound {
        /// Name of the missing model
        model: String,
    },

    /// Invalid request errors (bad parameters, malformed input)
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Error message
        message: String,
    },

    /// Errors reported by the inference server itself
    #[error("Provider error: {message}")]
    Provider {
        /// Error message from provider
        message: String,
        /// Optional error code from provider
        code: Option<String>,
    },

    /// The model finished without producing any text
    #[error("The model returned an empty response")]
    EmptyResponse,

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// Configuration errors (missing required config, invalid settings)
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },
}

impl ProviderError {
    /// Returns true if the provider could not be reached at all
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ProviderError::Network { .. } | ProviderError::Timeout { .. }
        )
    }

    /// Creates a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a timeout error
    pub fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }

    /// Creates a model-not-found error
    pub fn model_not_found(model: impl Into<String>) -> Self {
        Self::ModelNotFound {
            model: model.into(),
        }
    }

    /// Creates an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a provider error
    pub fn provider(message: impl Into<String>, code: Option<impl Into<String>>) -> Self {
        Self::Provider {
            message: message.into(),
            code: code.map(|c| c.into()),
        }
    }

    /// Creates a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_is_connection_error() {
        let err = ProviderError::network("Connection refused");
        assert!(err.is_connection_error());
        assert!(err.to_string().contains("Network error"));
        assert!(err.to_string().contains("Connection refused"));
    }

    #[test]
    fn test_timeout_is_connection_error() {
        let err = ProviderError::timeout(300);
        assert!(err.is_connection_error());
        assert!(err.to_string().contains("300"));
    }

    #[test]
    fn test_model_not_found_mentions_pull() {
        let err = ProviderError::model_not_found("llama3.2");
        assert!(!err.is_connection_error());
        assert!(err.to_string().contains("ollama pull llama3.2"));
    }

    #[test]
    fn test_provider_error_with_code() {
        let err = ProviderError::provider("Server error", Some::<&str>("500"));
        assert!(matches!(err, ProviderError::Provider { code: Some(_), .. }));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let provider_err: ProviderError = json_err.into();
        assert!(matches!(provider_err, ProviderError::Serialization { .. }));
    }

    #[test]
    fn test_empty_response_display() {
        assert_eq!(
            ProviderError::EmptyResponse.to_string(),
            "The model returned an empty response"
        );
    }
}
