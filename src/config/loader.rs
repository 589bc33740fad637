use crate::config::schema::{Config, DATA_DIR_NAME};
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(test)]
use std::sync::Mutex;

#[cfg(test)]
static CONFIG_TEST_ENV_LOCK: Mutex<()> = Mutex::new(());

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file contains invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
}

/// Loads the configuration: defaults, then the config file, then
/// environment variables, then CLI flags.
pub fn load_config(cli_model: Option<String>, cli_config_path: Option<PathBuf>) -> Result<Config> {
    tracing::debug!("Loading configuration");

    let mut config = Config::default();

    // Layer 1: config file (~/.azalea/config.json)
    let config_file = cli_config_path.clone().or_else(get_default_config_path);

    if let Some(ref path) = config_file {
        if path.exists() {
            tracing::debug!(config_path = %path.display(), "Loading configuration from file");
            config = merge_config_from_file(config, path)?;
        } else {
            tracing::debug!(config_path = %path.display(), "Config file not found, using defaults");
        }
    }

    // Layer 2: environment variables
    tracing::debug!("Applying environment variable overrides");
    config = merge_env_variables(config);

    // Layer 3: CLI flags
    if let Some(model) = cli_model.filter(|m| !m.is_empty()) {
        tracing::debug!(model = %model, "Applying CLI model override");
        config.ollama.default_model = model;
    }

    let summary = config.get_safe_summary();
    tracing::debug!(
        telegram_configured = summary.telegram_configured,
        admin_count = summary.admin_count,
        daily_limit = summary.daily_limit,
        data_dir = %summary.data_dir.display(),
        model = %summary.model,
        ollama_url = %summary.ollama_url,
        "Configuration loaded successfully"
    );

    Ok(config)
}

fn get_default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DATA_DIR_NAME).join("config.json"))
}

fn merge_config_from_file(config: Config, path: &Path) -> Result<Config> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(config),
        Err(e) => return Err(e).context("Failed to read metadata for config file"),
    };

    let mode = metadata.permissions().mode() & 0o777;
    if mode != 0o600 {
        tracing::error!(
            "Config file {:?} has permissions {:o}, expected 0600 - skipping for security",
            path,
            mode
        );
        return Ok(config);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let file_config: Config = serde_json::from_str(&content).map_err(|e| {
        eprintln!("Error: Configuration file contains invalid JSON.");
        eprintln!("Suggestion: Run 'azalea onboard' to recreate the configuration file.");
        ConfigError::InvalidJson(e)
    })?;

    Ok(file_config)
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn merge_env_variables(mut config: Config) -> Config {
    if let Some(token) = env_var("TELEGRAM_BOT_TOKEN") {
        config.telegram_token = Some(token);
    }

    if let Some(admins) = env_var("AZALEA_ADMINS") {
        let admins: Vec<String> = admins
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
            .collect();
        if !admins.is_empty() {
            config.admins = admins;
        }
    }

    if let Some(limit) = env_var("AZALEA_DAILY_LIMIT") {
        match limit.parse::<u32>() {
            Ok(limit) => config.daily_limit = limit,
            Err(e) => tracing::warn!(value = %limit, "Ignoring invalid AZALEA_DAILY_LIMIT: {}", e),
        }
    }

    if let Some(dir) = env_var("AZALEA_DATA_DIR") {
        config.data_dir = Some(PathBuf::from(dir));
    }

    if let Some(host) = env_var("OLLAMA_HOST") {
        config.ollama.base_url = normalize_ollama_host(&host);
    }

    config
}

/// Accepts `host:port` as well as a full URL, like the ollama CLI does
fn normalize_ollama_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let json = serde_json::to_string_pretty(config)?;

    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create config file: {:?}", path))?;

    file.write_all(json.as_bytes())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    let mut permissions = file.metadata()?.permissions();
    permissions.set_mode(0o600);
    fs::set_permissions(path, permissions)
        .with_context(|| format!("Failed to set permissions on config file: {:?}", path))?;

    tracing::info!("Configuration saved to {:?}", path);
    Ok(())
}

pub fn get_config_path() -> Option<PathBuf> {
    get_default_config_path()
}
