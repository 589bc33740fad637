//! User-facing reply texts (Telegram HTML)

use teloxide::utils::html::escape;

use crate::policy::{Mode, ModeConfig};
use crate::session::Turn;
use crate::utils::AzaleaError;

/// Longest `/history` reply, in characters after escaping
pub const HISTORY_MAX_CHARS: usize = 4000;

/// Telegram's limit for one message, in characters after escaping
pub const MESSAGE_MAX_CHARS: usize = 4096;

pub const WELCOME: &str = "<b>⚠ Disclaimer</b>\n\n\
<i>This AI is experimental and for research purposes only. \
You assume full responsibility. Do not use for illegal or harmful activities.</i>\n\n\
👋 <b>Welcome to Azalea Experimental AI</b>\n\
An experimental AI with multiple psychological modes.";

pub const HELP: &str = "📘 Commands:\n\
/clear — reset all data\n\
/history — view recent chat\n\
/mode — show the current mode\n\
🔄 New Session — clear memory\n\
\n🧠 Choose a mode below:";

pub const INTRO: &str = "You are now connected to Azalea AI.\n\
You may choose a mode or ask me anything!";

pub const MEMORY_CLEARED: &str = "🆕 Conversation memory cleared.";
pub const ALL_DATA_RESET: &str = "🔄 All data reset.";
pub const NO_HISTORY: &str = "📭 No history found.";
pub const LIMIT_REACHED: &str = "⚠ Free message limit reached. Please upgrade.";
pub const STILL_GENERATING: &str = "⏳ Still generating your previous reply, please wait.";
pub const GENERATING: &str = "⌛ Generating...";
pub const UNKNOWN_MODE: &str = "Unknown mode";
pub const ADMINS_ONLY: &str = "⛔ This command is for admins only.";

pub fn pro_access(url: &str) -> String {
    format!("Get Pro Access at: {}", escape(url))
}

pub fn mode_set(mode: Mode) -> String {
    format!("Mode set to: {}", mode)
}

pub fn current_mode(mode: Mode, config: &ModeConfig, remaining: Option<u32>) -> String {
    let quota = match remaining {
        Some(n) => format!("{} free messages left", n),
        None => "unlimited messages".to_string(),
    };
    format!(
        "🧠 Current mode: <b>{}</b> (temperature {:.2})\n💬 {}",
        mode, config.temperature, quota
    )
}

/// Generated text, escaped for HTML and cut to fit one message
pub fn reply(text: &str) -> String {
    escape_truncated(text, MESSAGE_MAX_CHARS)
}

/// Escapes `text` for HTML, keeping at most `max_chars` escaped characters.
///
/// The cut happens between source characters, never inside an entity.
pub fn escape_truncated(text: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(text.len().min(max_chars * 4));
    let mut used = 0;
    let mut buf = [0u8; 4];

    for c in text.chars() {
        let escaped = escape(c.encode_utf8(&mut buf));
        let width = escaped.chars().count();
        if used + width > max_chars {
            break;
        }
        out.push_str(&escaped);
        used += width;
    }
    out
}

pub fn generation_error(error: &impl std::fmt::Display) -> String {
    format!("⚠ Error: {}", escape(&error.to_string()))
}

pub fn storage_error(error: &AzaleaError) -> String {
    format!("⚠ Could not save your data: {}", escape(&error.to_string()))
}

pub fn usage(command: &str) -> String {
    format!("Usage: /{} &lt;user_id&gt;", command)
}

pub fn pro_granted(user_id: &str) -> String {
    format!("✅ Pro access granted to {}.", escape(user_id))
}

pub fn pro_revoked(user_id: &str) -> String {
    format!("❎ Pro access revoked for {}.", escape(user_id))
}

/// Stored turns as `👤 q\n🤖 a` blocks separated by blank lines.
///
/// Escaped, then kept within `HISTORY_MAX_CHARS` characters.
pub fn history<'a, I>(turns: I) -> String
where
    I: IntoIterator<Item = &'a Turn>,
{
    let raw = turns
        .into_iter()
        .map(|turn| format!("👤 {}\n🤖 {}", turn.question(), turn.answer()))
        .collect::<Vec<_>>()
        .join("\n\n");

    if raw.is_empty() {
        return NO_HISTORY.to_string();
    }

    escape_truncated(&raw, HISTORY_MAX_CHARS)
}
