use crate::config::{self, Config};
use crate::policy::ModeRegistry;
use crate::session::{Session, SessionStore};
use crate::workspace;
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "azalea")]
#[command(about = "azalea - Telegram companion bot backed by a local model")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Enable verbose (DEBUG) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to an alternate config.json
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the Ollama model for this run
    #[arg(short, long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Display version information
    Version,

    /// Create the data directory, prompt files and config.json
    Onboard {
        /// Absolute path of the data directory (default: ~/.azalea)
        #[arg(short, long)]
        path: Option<String>,

        /// Accept defaults without prompting
        #[arg(short, long)]
        yes: bool,
    },

    /// Run the bot until SIGINT or SIGTERM
    Gateway,

    /// List the available modes and their prompt files
    Modes,

    /// Inspect stored sessions
    Sessions {
        /// Show a single user's session
        #[arg(short, long, value_name = "USER_ID")]
        user: Option<String>,
    },
}

pub fn run(cli: Cli) {
    let result = match cli.command {
        Some(Commands::Version) => {
            print_version();
            Ok(())
        }
        Some(Commands::Onboard { path, yes }) => {
            config::run_onboarding(cli.verbose, path, yes)
        }
        Some(Commands::Gateway) => handle_gateway(cli.model, cli.config),
        Some(Commands::Modes) => handle_modes(cli.model, cli.config),
        Some(Commands::Sessions { user }) => handle_sessions(cli.model, cli.config, user),
        None => {
            print_help();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn handle_gateway(model: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = config::load_config(model, config_path)?;
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(crate::gateway::run_gateway(&config))
}

fn handle_modes(model: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = config::load_config(model, config_path)?;
    let registry = ModeRegistry::builtin(config.prompts_dir());
    print!("{}", format_modes(&registry));

    let missing = workspace::missing_prompt_files(&registry);
    if !missing.is_empty() {
        println!();
        println!(
            "{} prompt file(s) missing from {}; those modes use the default prompt.",
            missing.len(),
            registry.prompts_dir().display()
        );
        println!("Run 'azalea onboard' to create them.");
    }
    Ok(())
}

fn format_modes(registry: &ModeRegistry) -> String {
    let mut out = String::new();
    for mode in registry.modes() {
        let Some(spec) = registry.spec(mode) else {
            continue;
        };
        let file = spec.prompt_file.as_deref().unwrap_or("(default prompt)");
        out.push_str(&format!(
            "{:<12} {:<18} temperature {:.1}\n",
            mode.as_str(),
            file,
            spec.effective_temperature()
        ));
    }
    out
}

fn handle_sessions(
    model: Option<String>,
    config_path: Option<PathBuf>,
    user: Option<String>,
) -> Result<()> {
    let config = config::load_config(model, config_path)?;
    let store = SessionStore::in_dir(&config.data_dir());
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let sessions = match runtime.block_on(store.load()) {
        Ok(sessions) => sessions,
        Err(e) => {
            if let Some(hint) = e.suggestion() {
                eprintln!("Hint: {}", hint);
            }
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to load {}", store.path().display())));
        }
    };

    match user {
        Some(user_id) => match sessions.get(&user_id) {
            Some(session) => print!("{}", format_session_detail(&user_id, session, &config)),
            None => println!("No session for user {}", user_id),
        },
        None => {
            println!("{} session(s) in {}", sessions.len(), store.path().display());
            for (user_id, session) in &sessions {
                println!("{}", format_session_line(user_id, session));
            }
        }
    }
    Ok(())
}

fn format_session_line(user_id: &str, session: &Session) -> String {
    format!(
        "{:<14} {:<10} messages {:<4} turns {:<3}{}",
        user_id,
        session.mode.as_str(),
        session.message_count,
        session.history.len(),
        if session.is_pro { " pro" } else { "" }
    )
}

fn format_session_detail(user_id: &str, session: &Session, config: &Config) -> String {
    let mut out = format!("User:     {}\n", user_id);
    out.push_str(&format!("Mode:     {}\n", session.mode));
    out.push_str(&format!(
        "Messages: {} of {}\n",
        session.message_count, config.daily_limit
    ));
    out.push_str(&format!("Pro:      {}\n", if session.is_pro { "yes" } else { "no" }));
    out.push_str(&format!("History:  {} turn(s)\n", session.history.len()));
    for turn in &session.history {
        out.push_str(&format!("  > {}\n  < {}\n", turn.question(), turn.answer()));
    }
    out
}

pub fn extract_command_from_error(error_msg: &str) -> String {
    // e.g. "error: unrecognized subcommand 'invalid_command'"
    if let Some(start) = error_msg.find('\'') {
        if let Some(end) = error_msg[start + 1..].find('\'') {
            return error_msg[start + 1..start + 1 + end].to_string();
        }
    }
    "unknown".to_string()
}

fn print_version() {
    println!("azalea {}", env!("CARGO_PKG_VERSION"));
}

fn print_help() {
    let mut cmd = Cli::command();
    if cmd.print_help().is_err() {
        println!("Usage: azalea <COMMAND>");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Mode;
    use crate::session::Turn;

    #[test]
    fn test_version_string_format() {
        let version = env!("CARGO_PKG_VERSION");
        let parts: Vec<&str> = version.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.parse::<u32>().is_ok()));
    }

    #[test]
    fn test_extract_command_from_error() {
        let msg = "error: unrecognized subcommand 'foo_bar'";
        assert_eq!(extract_command_from_error(msg), "foo_bar");
        assert_eq!(extract_command_from_error("no command here"), "unknown");
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from(["azalea", "sessions", "--user", "42", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Some(Commands::Sessions { user }) => assert_eq!(user.as_deref(), Some("42")),
            _ => panic!("expected sessions command"),
        }
    }

    #[test]
    fn test_cli_onboard_flags() {
        let cli = Cli::try_parse_from(["azalea", "onboard", "--yes", "--path", "/srv/azalea"]).unwrap();
        match cli.command {
            Some(Commands::Onboard { path, yes }) => {
                assert!(yes);
                assert_eq!(path.as_deref(), Some("/srv/azalea"));
            }
            _ => panic!("expected onboard command"),
        }
    }

    #[test]
    fn test_format_modes_lists_every_mode() {
        let registry = ModeRegistry::builtin("/unused");
        let listing = format_modes(&registry);
        for mode in Mode::ALL {
            assert!(listing.contains(mode.as_str()), "missing {}", mode);
        }
        assert!(listing.contains("therapist.txt"));
    }

    #[test]
    fn test_format_session_detail() {
        let mut session = Session::new();
        session.message_count = 3;
        session.is_pro = true;
        session.push_turn(Turn::new("hi", "hello"));

        let detail = format_session_detail("42", &session, &Config::default());
        assert!(detail.contains("Messages: 3 of 10"));
        assert!(detail.contains("Pro:      yes"));
        assert!(detail.contains("> hi"));
        assert!(detail.contains("< hello"));

        let line = format_session_line("42", &session);
        assert!(line.starts_with("42"));
        assert!(line.ends_with(" pro"));
    }
}
