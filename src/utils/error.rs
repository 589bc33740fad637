//! Centralized error types and conversions for azalea
//!
//! Library code returns `AzaleaError`; the CLI and gateway wrap it with
//! `anyhow` context.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::providers::ProviderError;

/// Global error type for azalea operations
#[derive(Error, Debug)]
pub enum AzaleaError {
    /// The session snapshot exists but is not valid JSON for a session map
    #[error("Session snapshot {} is corrupt: {message}", AzaleaError::sanitize_path(.path))]
    CorruptStore { path: PathBuf, message: String },

    /// The session snapshot exists but could not be read
    #[error("Failed to read session snapshot {}: {source}", AzaleaError::sanitize_path(.path))]
    StorageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisting the session snapshot failed
    #[error("Failed to write session snapshot {}: {source}", AzaleaError::sanitize_path(.path))]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The inference engine failed
    #[error("Generation failed: {0}")]
    Generation(#[from] ProviderError),

    /// Serialization errors outside of snapshot loading
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl AzaleaError {
    /// Sanitize a path for display (remove sensitive user information)
    fn sanitize_path(path: &Path) -> String {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                return format!("~/{}", stripped.display());
            }
        }
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|s| format!("<sanitized>/{}", s))
            .unwrap_or_else(|| "<path>".to_string())
    }

    pub fn corrupt_store(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CorruptStore {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn storage_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageRead {
            path: path.into(),
            source,
        }
    }

    pub fn storage_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageWrite {
            path: path.into(),
            source,
        }
    }

    /// Returns an operator-facing hint for the error, if one applies
    pub fn suggestion(&self) -> Option<String> {
        match self {
            AzaleaError::CorruptStore { .. } => Some(
                "Fix or move the snapshot file aside; azalea will not overwrite it.".to_string(),
            ),
            AzaleaError::StorageRead { .. } | AzaleaError::StorageWrite { .. } => {
                Some("Check free disk space and permissions of the data directory.".to_string())
            }
            AzaleaError::Generation(err) if err.is_connection_error() => {
                Some("Is Ollama running? Start it with: ollama serve".to_string())
            }
            _ => None,
        }
    }
}

/// Result type alias using AzaleaError
pub type Result<T> = std::result::Result<T, AzaleaError>;

impl From<serde_json::Error> for AzaleaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}
