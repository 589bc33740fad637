use crate::config::schema::{Config, DATA_DIR_NAME};
use crate::config::save_config;
use crate::channels::telegram::is_valid_token_format;
use crate::policy::DEFAULT_DAILY_LIMIT;
use crate::workspace;
use anyhow::{Context, Result};
use inquire::validator::Validation;
use inquire::{Confirm, Select, Text};
use std::path::{Path, PathBuf};

pub fn run_onboarding(verbose: bool, custom_path: Option<String>, skip_prompts: bool) -> Result<()> {
    let base_path = determine_base_path(custom_path)?;

    if verbose {
        tracing::debug!(path = %base_path.display(), "Starting onboarding");
    }

    let config_path = base_path.join("config.json");
    if config_path.exists() {
        let should_reconfigure = handle_reconfiguration(&base_path, skip_prompts, verbose)?;
        if !should_reconfigure {
            workspace::initialize_workspace(&base_path, verbose)
                .context("Failed to initialize workspace")?;
            return Ok(());
        }
    }

    workspace::initialize_workspace(&base_path, verbose).context("Failed to initialize workspace")?;
    println!("Data directory initialized at {}", base_path.display());

    let Some(config) = collect_user_configuration(&base_path, skip_prompts, verbose)? else {
        println!("Configuration cancelled. No changes were made.");
        return Ok(());
    };

    save_config(&config, &config_path).context("Failed to save configuration")?;
    if verbose {
        println!("Configuration saved to: {}", config_path.display());
    }

    display_completion_summary(&config, verbose);
    Ok(())
}

fn determine_base_path(custom_path: Option<String>) -> Result<PathBuf> {
    if let Some(path) = custom_path {
        let path = PathBuf::from(path);
        if !path.is_absolute() {
            return Err(anyhow::anyhow!(
                "Invalid path: '{}'. Please provide an absolute path.",
                path.display()
            ));
        }
        Ok(path)
    } else {
        dirs::home_dir()
            .map(|p| p.join(DATA_DIR_NAME))
            .context("Could not determine home directory")
    }
}

fn handle_reconfiguration(base_path: &Path, skip_prompts: bool, verbose: bool) -> Result<bool> {
    if verbose {
        tracing::debug!("Configuration already exists, checking for reconfiguration");
    }

    println!("Configuration already exists at {}", base_path.display());

    let reconfigure = if skip_prompts {
        false
    } else {
        Confirm::new("Do you want to reconfigure? (y/N)")
            .with_default(false)
            .with_help_message("Press 'y' to overwrite existing configuration, 'n' to preserve it")
            .prompt()?
    };

    if !reconfigure {
        println!("Preserving existing configuration.");
        return Ok(false);
    }

    println!("Proceeding with reconfiguration...");
    Ok(true)
}

/// Builds the configuration to save; `None` if the user cancelled
fn collect_user_configuration(
    base_path: &Path,
    skip_prompts: bool,
    verbose: bool,
) -> Result<Option<Config>> {
    let mut config = Config {
        data_dir: Some(base_path.to_path_buf()),
        ..Config::default()
    };

    if skip_prompts {
        if verbose {
            tracing::debug!("Skipping prompts, using default configuration");
        }
        return Ok(Some(config));
    }

    println!();
    println!("Let's configure azalea!");

    config.telegram_token = prompt_telegram_token(verbose)?;
    config.admins = prompt_admins()?;
    config.daily_limit = prompt_daily_limit()?;
    config.ollama.default_model = prompt_model(&config.ollama.default_model)?;

    if !confirm_configuration(&config)? {
        return Ok(None);
    }

    Ok(Some(config))
}

fn prompt_telegram_token(verbose: bool) -> Result<Option<String>> {
    println!();
    println!("Telegram Bot Configuration");
    println!("  Step 1: Open Telegram and message @BotFather");
    println!("  Step 2: Type /newbot and follow the instructions");
    println!("  Step 3: Copy the bot token here");

    let token = Text::new("Enter your Telegram bot token (or press Enter to skip):")
        .with_validator(|input: &str| {
            if input.is_empty() || is_valid_token_format(input) {
                Ok(Validation::Valid)
            } else {
                Ok(Validation::Invalid(
                    "Invalid token format. Should look like: 1234567890:ABCdefGHIjklMNOpqrsTUVwxyz"
                        .into(),
                ))
            }
        })
        .with_help_message("Press Enter without typing to skip; TELEGRAM_BOT_TOKEN also works")
        .prompt()?;

    if token.is_empty() {
        if verbose {
            tracing::debug!("User skipped Telegram token configuration");
        }
        return Ok(None);
    }

    Ok(Some(token))
}

fn prompt_admins() -> Result<Vec<String>> {
    println!();
    println!("Admins are never rate limited and can /grant and /revoke pro access.");
    println!("To find your Telegram id, message @userinfobot.");

    let input = Text::new("Admin Telegram ids, comma separated (or press Enter to skip):")
        .with_validator(|input: &str| Ok(validate_admin_list(input)))
        .prompt()?;

    Ok(parse_admin_list(&input))
}

fn validate_admin_list(input: &str) -> Validation {
    let all_numeric = input
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .all(|id| id.chars().all(|c| c.is_ascii_digit()));

    if all_numeric {
        Validation::Valid
    } else {
        Validation::Invalid("Ids must be numbers, e.g. 123456789, 987654321".into())
    }
}

fn parse_admin_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn prompt_daily_limit() -> Result<u32> {
    let input = Text::new("Free messages per user:")
        .with_default(&DEFAULT_DAILY_LIMIT.to_string())
        .with_validator(|input: &str| match input.trim().parse::<u32>() {
            Ok(_) => Ok(Validation::Valid),
            Err(_) => Ok(Validation::Invalid("Enter a whole number".into())),
        })
        .prompt()?;

    Ok(input.trim().parse().unwrap_or(DEFAULT_DAILY_LIMIT))
}

fn prompt_model(default_model: &str) -> Result<String> {
    println!();
    println!("Ollama Configuration");
    println!("Make sure Ollama is running locally and the model is pulled.");

    let options = vec![default_model, "mistral", "nous-hermes2", "Other..."];
    let selection = Select::new("Select model:", options)
        .with_help_message("Use arrow keys to navigate, Enter to select")
        .prompt()?;

    if selection != "Other..." {
        return Ok(selection.to_string());
    }

    let model = Text::new("Model name:")
        .with_validator(|input: &str| {
            if input.trim().is_empty() {
                Ok(Validation::Invalid("Model name cannot be empty".into()))
            } else {
                Ok(Validation::Valid)
            }
        })
        .prompt()?;
    Ok(model.trim().to_string())
}

fn confirm_configuration(config: &Config) -> Result<bool> {
    println!();
    println!("Please review your configuration:");
    println!();
    print_summary(config);
    println!();

    let confirmed = Confirm::new("Save this configuration?")
        .with_default(true)
        .with_help_message("Press 'y' to save, 'n' to cancel")
        .prompt()?;

    Ok(confirmed)
}

fn print_summary(config: &Config) {
    match &config.telegram_token {
        Some(token) => println!("  Telegram Bot: {}", mask_secret(token)),
        None => println!("  Telegram Bot: (not set)"),
    }

    if config.admins.is_empty() {
        println!("  Admins: (none)");
    } else {
        println!("  Admins: {}", config.admins.join(", "));
    }

    println!("  Free messages per user: {}", config.daily_limit);
    println!("  Model: {} at {}", config.ollama.default_model, config.ollama.base_url);
    println!("  Data directory: {}", config.data_dir().display());
}

fn display_completion_summary(config: &Config, verbose: bool) {
    println!();
    println!("Configuration Complete!");
    print_summary(config);

    println!();
    println!("Next Steps:");
    println!("  Edit the prompt files in {}", config.prompts_dir().display());
    println!("  Run 'azalea gateway' to start the bot");
    println!();
    println!("Tip: Run 'azalea onboard' again to reconfigure at any time.");

    if verbose {
        tracing::debug!("Onboarding completed successfully");
    }
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 10 {
        "***".to_string()
    } else {
        let start: String = chars[..6].iter().collect();
        let end: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_determine_base_path_with_custom() {
        let result = determine_base_path(Some("/tmp/test_azalea".to_string()));
        assert_eq!(result.unwrap(), PathBuf::from("/tmp/test_azalea"));
    }

    #[test]
    fn test_determine_base_path_with_invalid() {
        assert!(determine_base_path(Some("relative".to_string())).is_err());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("short"), "***");

        let result = mask_secret("1234567890:ABCdefGHI");
        assert!(result.starts_with("123456"));
        assert!(result.ends_with("fGHI"));
        assert!(result.contains("..."));
    }

    #[test]
    fn test_admin_list_parsing() {
        assert_eq!(parse_admin_list("1, 22 ,,333"), vec!["1", "22", "333"]);
        assert!(parse_admin_list("").is_empty());
        assert!(matches!(validate_admin_list("1, 2"), Validation::Valid));
        assert!(matches!(validate_admin_list(""), Validation::Valid));
        assert!(matches!(validate_admin_list("1, bob"), Validation::Invalid(_)));
    }

    #[test]
    fn test_collect_user_configuration_skip() {
        let temp_dir = TempDir::new().unwrap();
        let config = collect_user_configuration(temp_dir.path(), true, false)
            .unwrap()
            .unwrap();

        assert!(config.telegram_token.is_none());
        assert!(config.admins.is_empty());
        assert_eq!(config.data_dir(), temp_dir.path());
    }

    #[test]
    fn test_non_interactive_onboarding() {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path().join("azalea");

        run_onboarding(false, Some(base_path.display().to_string()), true).unwrap();

        assert!(base_path.join("config.json").exists());
        assert!(base_path.join("prompts").join("therapist.txt").exists());

        // A second run preserves the existing configuration
        std::fs::write(base_path.join("prompts").join("god.txt"), "edited").unwrap();
        run_onboarding(false, Some(base_path.display().to_string()), true).unwrap();
        assert_eq!(
            std::fs::read_to_string(base_path.join("prompts").join("god.txt")).unwrap(),
            "edited"
        );
    }
}
