//! Gateway daemon for azalea
//!
//! Loads the session snapshot, wires the conversation service to the
//! Telegram adapter and runs until SIGINT or SIGTERM.

use crate::bot::BotHandler;
use crate::channels::TelegramChannel;
use crate::config::Config;
use crate::conversation::{ConversationService, SLOW_GENERATION_P95_MS};
use crate::policy::{AdminList, ModeRegistry, QuotaPolicy};
use crate::providers::{LlmProvider, OllamaProvider};
use crate::session::{SessionManager, SessionStore};
use crate::workspace;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const MEMORY_WARNING_THRESHOLD_MB: u64 = 200;
const MEMORY_CHECK_INTERVAL_SECS: u64 = 60;
const SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Runs the bot until a shutdown signal arrives.
///
/// A corrupt or unreadable session snapshot is fatal: the gateway refuses
/// to start rather than overwrite it with an empty one.
pub async fn run_gateway(config: &Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting azalea gateway daemon"
    );

    let token = config.telegram_token.clone().context(
        "No Telegram token configured. Set TELEGRAM_BOT_TOKEN or run 'azalea onboard'",
    )?;

    let data_dir = config.data_dir();
    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let store = SessionStore::in_dir(&data_dir);
    let sessions = match SessionManager::open(store).await {
        Ok(manager) => Arc::new(manager),
        Err(e) => {
            if let Some(hint) = e.suggestion() {
                error!(error = %e, "{}", hint);
            }
            return Err(anyhow::Error::new(e).context("Failed to load sessions"));
        }
    };

    let provider: Arc<dyn LlmProvider> = Arc::new(
        OllamaProvider::try_new(config.ollama.clone()).context("Failed to create Ollama provider")?,
    );
    info!(
        provider = provider.provider_name(),
        model = %provider.default_model(),
        "LLM provider initialized"
    );

    let registry = ModeRegistry::builtin(config.prompts_dir());
    let missing = workspace::missing_prompt_files(&registry);
    if !missing.is_empty() {
        warn!(
            prompts_dir = %registry.prompts_dir().display(),
            missing = ?missing,
            "Some prompt files are missing; those modes use the default prompt"
        );
    }

    let quota = QuotaPolicy::new(AdminList::new(config.admins.iter()), config.daily_limit);
    info!(
        daily_limit = quota.daily_limit(),
        admins = config.admins.len(),
        "Quota policy initialized"
    );

    let service = Arc::new(ConversationService::new(
        Arc::clone(&sessions),
        provider,
        registry,
        quota,
    ));
    let handler = Arc::new(BotHandler::new(Arc::clone(&service), config.pro_url.clone()));

    let channel = TelegramChannel::new(token, handler, Some(config.loading_animation()))?;
    let dispatcher_handle = channel
        .start()
        .await
        .context("Failed to start Telegram channel")?;

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if let Err(e) = wait_for_signal().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        let _ = shutdown_tx.send(()).await;
    });

    let (memory_shutdown_tx, memory_shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    let monitor_service = Arc::clone(&service);
    let monitor_handle = tokio::spawn(async move {
        monitor_resources(monitor_service, memory_shutdown_rx).await;
    });

    info!("Gateway daemon is running. Press Ctrl+C to stop.");

    let mut dispatcher_handle = dispatcher_handle;
    tokio::select! {
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received, starting graceful shutdown...");
        }
        result = &mut dispatcher_handle => {
            if let Err(e) = result {
                error!("Telegram dispatcher panicked: {}", e);
            } else {
                warn!("Telegram dispatcher exited unexpectedly");
            }
        }
    }

    info!("Shutting down Telegram channel...");
    if let Err(e) = channel.shutdown().await {
        error!("Error shutting down Telegram channel: {}", e);
    }
    let timeout = Duration::from_secs(SHUTDOWN_TIMEOUT_SECS);
    if !dispatcher_handle.is_finished() {
        match tokio::time::timeout(timeout, dispatcher_handle).await {
            Ok(Ok(())) => info!("Telegram dispatcher stopped gracefully"),
            Ok(Err(e)) => error!("Telegram dispatcher panicked: {}", e),
            Err(_) => error!("Telegram dispatcher did not stop within {}s", SHUTDOWN_TIMEOUT_SECS),
        }
    }

    let _ = memory_shutdown_tx.send(()).await;
    if tokio::time::timeout(timeout, monitor_handle).await.is_err() {
        error!("Monitoring task did not stop within {}s", SHUTDOWN_TIMEOUT_SECS);
    }

    // Every mutation is already persisted; this write only covers a failed one
    info!("Flushing sessions to disk...");
    let snapshot = sessions.snapshot().await;
    match sessions.store().save(&snapshot).await {
        Ok(()) => info!("{} sessions flushed to disk", snapshot.len()),
        Err(e) => error!("Failed to save sessions during shutdown: {}", e),
    }

    info!("Gateway daemon stopped gracefully");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown..."),
        _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown..."),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, initiating graceful shutdown...");
    Ok(())
}

/// Periodically logs process memory and generation latency
async fn monitor_resources(
    service: Arc<ConversationService>,
    mut shutdown_rx: tokio::sync::mpsc::Receiver<()>,
) {
    use sysinfo::{System, get_current_pid};

    let mut system = System::new_all();
    let current_pid = match get_current_pid() {
        Ok(pid) => pid,
        Err(e) => {
            error!(
                "Failed to get current PID for memory monitoring: {}. Memory monitoring disabled.",
                e
            );
            return;
        }
    };
    let mut interval = tokio::time::interval(Duration::from_secs(MEMORY_CHECK_INTERVAL_SECS));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                system.refresh_all();
                if let Some(process) = system.process(current_pid) {
                    let memory_mb = process.memory() / (1024 * 1024);
                    if memory_mb > MEMORY_WARNING_THRESHOLD_MB {
                        warn!(memory_mb = memory_mb, threshold_mb = MEMORY_WARNING_THRESHOLD_MB, "Memory usage exceeds threshold");
                    } else {
                        debug!(memory_mb = memory_mb, "Current memory usage");
                    }
                }

                let metrics = service.metrics();
                if let Some(p95) = metrics.percentile_95() {
                    if p95 > SLOW_GENERATION_P95_MS {
                        warn!(p95_ms = p95, samples = metrics.sample_count(), "Generations are slow");
                    } else {
                        debug!(p95_ms = p95, samples = metrics.sample_count(), "Generation latency");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                debug!("Monitoring task received shutdown signal");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_gateway_command_available() {
        use crate::cli::Cli;
        use clap::CommandFactory;

        let cmd = Cli::command();
        let subcommands: Vec<_> = cmd
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        assert!(
            subcommands.contains(&"gateway".to_string()),
            "Gateway command should be available"
        );
    }

    #[tokio::test]
    async fn test_gateway_requires_token() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: Some(temp_dir.path().to_path_buf()),
            ..Config::default()
        };

        let err = run_gateway(&config).await.unwrap_err();
        assert!(err.to_string().contains("No Telegram token"));
    }

    #[tokio::test]
    async fn test_gateway_refuses_corrupt_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot = temp_dir.path().join("users.json");
        std::fs::write(&snapshot, "{not json").unwrap();

        let config = Config {
            telegram_token: Some("123456789:ABCdefGHIjklMNOpqrsTUVwxyz".to_string()),
            data_dir: Some(temp_dir.path().to_path_buf()),
            ..Config::default()
        };

        let err = run_gateway(&config).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load sessions"));
        assert_eq!(std::fs::read_to_string(&snapshot).unwrap(), "{not json");
    }
}
