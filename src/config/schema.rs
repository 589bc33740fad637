use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::policy::DEFAULT_DAILY_LIMIT;
use crate::providers::OllamaConfig;

pub const DEFAULT_PRO_URL: &str = "https://azalea.ai/subscribe";

/// Name of the data directory under the home directory
pub const DATA_DIR_NAME: &str = ".azalea";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_token: Option<String>,

    /// User ids exempt from the quota and allowed to run admin commands
    #[serde(default)]
    pub admins: Vec<String>,

    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loading_animation: Option<PathBuf>,

    #[serde(default = "default_pro_url")]
    pub pro_url: String,

    #[serde(default)]
    pub ollama: OllamaConfig,
}

fn default_daily_limit() -> u32 {
    DEFAULT_DAILY_LIMIT
}

fn default_pro_url() -> String {
    DEFAULT_PRO_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram_token: None,
            admins: Vec::new(),
            daily_limit: DEFAULT_DAILY_LIMIT,
            data_dir: None,
            prompts_dir: None,
            loading_animation: None,
            pro_url: default_pro_url(),
            ollama: OllamaConfig::default(),
        }
    }
}

/// Loggable view of a configuration, without secrets
#[derive(Debug, Clone)]
pub struct SafeConfigSummary {
    pub telegram_configured: bool,
    pub admin_count: usize,
    pub daily_limit: u32,
    pub data_dir: PathBuf,
    pub model: String,
    pub ollama_url: String,
}

impl Config {
    /// Data directory, `~/.azalea` unless configured
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Prompt directory, `<data_dir>/prompts` unless configured
    pub fn prompts_dir(&self) -> PathBuf {
        self.prompts_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("prompts"))
    }

    /// Loading animation, `<data_dir>/loading.gif` unless configured
    pub fn loading_animation(&self) -> PathBuf {
        self.loading_animation
            .clone()
            .unwrap_or_else(|| self.data_dir().join("loading.gif"))
    }

    pub fn get_safe_summary(&self) -> SafeConfigSummary {
        SafeConfigSummary {
            telegram_configured: self
                .telegram_token
                .as_ref()
                .is_some_and(|t| !t.is_empty()),
            admin_count: self.admins.len(),
            daily_limit: self.daily_limit,
            data_dir: self.data_dir(),
            model: self.ollama.default_model.clone(),
            ollama_url: self.ollama.base_url.clone(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DATA_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.telegram_token.is_none());
        assert!(config.admins.is_empty());
        assert_eq!(config.daily_limit, 10);
        assert_eq!(config.pro_url, "https://azalea.ai/subscribe");
        assert_eq!(config.ollama.default_model, "llama3.2");
    }

    #[test]
    fn test_derived_paths() {
        let config = Config {
            data_dir: Some(PathBuf::from("/srv/azalea")),
            ..Config::default()
        };
        assert_eq!(config.prompts_dir(), PathBuf::from("/srv/azalea/prompts"));
        assert_eq!(config.loading_animation(), PathBuf::from("/srv/azalea/loading.gif"));

        let config = Config {
            data_dir: Some(PathBuf::from("/srv/azalea")),
            prompts_dir: Some(PathBuf::from("/etc/prompts")),
            ..Config::default()
        };
        assert_eq!(config.prompts_dir(), PathBuf::from("/etc/prompts"));
    }

    #[test]
    fn test_default_data_dir() {
        let config = Config::default();
        assert!(config.data_dir().ends_with(".azalea"));
    }

    #[test]
    fn test_config_deserialization_partial() {
        let json = r#"{
            "telegram_token": "123:abc",
            "admins": ["7290616621"],
            "ollama": {"default_model": "mistral"}
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.telegram_token.as_deref(), Some("123:abc"));
        assert_eq!(config.admins, vec!["7290616621"]);
        assert_eq!(config.daily_limit, 10);
        assert_eq!(config.ollama.default_model, "mistral");
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_safe_summary_hides_token() {
        let config = Config {
            telegram_token: Some("123:secret".to_string()),
            admins: vec!["1".to_string()],
            ..Config::default()
        };

        let summary = config.get_safe_summary();
        assert!(summary.telegram_configured);
        assert_eq!(summary.admin_count, 1);
        assert!(!format!("{:?}", summary).contains("secret"));
    }
}
