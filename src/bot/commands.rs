//! Classification of inbound text into bot commands

/// Main keyboard buttons, in display order
pub const BUTTON_START_CHAT: &str = "📝 Start Chat";
pub const BUTTON_HELP: &str = "❓ Help";
pub const BUTTON_NEW_SESSION: &str = "🔄 New Session";
pub const BUTTON_PRO: &str = "💼 Pro Access";

pub const MAIN_BUTTONS: [&str; 4] = [BUTTON_START_CHAT, BUTTON_HELP, BUTTON_NEW_SESSION, BUTTON_PRO];

/// Prefix of inline keyboard callback data selecting a mode
pub const MODE_CALLBACK_PREFIX: &str = "mode:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    NewSession,
    Clear,
    History,
    Pro,
    Intro,
    ShowMode,
    /// Admin: give pro status to the user id argument
    Grant(String),
    /// Admin: take pro status from the user id argument
    Revoke(String),
    /// Anything else is sent to the model
    Chat(String),
}

impl Command {
    /// Parses trimmed message text.
    ///
    /// Slash commands are case-insensitive and may carry a `@botname`
    /// suffix. Unrecognized slash commands are chat text.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();

        match text {
            BUTTON_START_CHAT => return Command::Intro,
            BUTTON_HELP => return Command::Help,
            BUTTON_NEW_SESSION => return Command::NewSession,
            BUTTON_PRO => return Command::Pro,
            _ => {}
        }

        let Some(rest) = text.strip_prefix('/') else {
            return Command::Chat(text.to_string());
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };
        let name = name.split('@').next().unwrap_or(name).to_lowercase();

        match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "new" => Command::NewSession,
            "clear" => Command::Clear,
            "history" => Command::History,
            "pro" => Command::Pro,
            "mode" => Command::ShowMode,
            "grant" => Command::Grant(first_arg(args)),
            "revoke" => Command::Revoke(first_arg(args)),
            _ => Command::Chat(text.to_string()),
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::NewSession => "new_session",
            Command::Clear => "clear",
            Command::History => "history",
            Command::Pro => "pro",
            Command::Intro => "intro",
            Command::ShowMode => "mode",
            Command::Grant(_) => "grant",
            Command::Revoke(_) => "revoke",
            Command::Chat(_) => "chat",
        }
    }
}

fn first_arg(args: &str) -> String {
    args.split_whitespace().next().unwrap_or("").to_string()
}

/// Extracts the mode name from `mode:<Name>` callback data
pub fn parse_mode_callback(data: &str) -> Option<&str> {
    data.strip_prefix(MODE_CALLBACK_PREFIX)
}
