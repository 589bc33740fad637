use crate::bot::commands::{MAIN_BUTTONS, MODE_CALLBACK_PREFIX};
use crate::bot::{BotHandler, texts};
use crate::channels::{Messenger, ProgressHandle};
use crate::chat::{InboundMessage, Keyboard, OutboundMessage};
use crate::policy::Mode;
use crate::utils::fs::file_exists;
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, KeyboardButton, KeyboardMarkup,
    MessageId, ParseMode, Update,
};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::sync::mpsc;

const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Inline mode buttons per keyboard row
const MODES_PER_ROW: usize = 4;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Invalid token format: {0}. Check @BotFather (https://t.me/BotFather) for a valid token.")]
    InvalidTokenFormat(String),

    #[error("Telegram API error: {0}")]
    ApiError(String),
}

/// Outbound half of the Telegram adapter
pub struct TelegramMessenger {
    bot: Bot,
    loading_animation: Option<PathBuf>,
}

impl TelegramMessenger {
    pub fn new(bot: Bot, loading_animation: Option<PathBuf>) -> Self {
        Self {
            bot,
            loading_animation,
        }
    }

    async fn animation_path(&self) -> Option<&PathBuf> {
        let path = self.loading_animation.as_ref()?;
        match file_exists(path).await {
            Ok(true) => Some(path),
            Ok(false) => None,
            Err(e) => {
                tracing::debug!(path = %path.display(), "Cannot stat loading animation: {}", e);
                None
            }
        }
    }

    async fn send_animation(&self, chat_id: i64, path: &PathBuf) -> Result<ProgressHandle> {
        let sent = self
            .bot
            .send_animation(ChatId(chat_id), InputFile::file(path.clone()))
            .caption(texts::GENERATING)
            .await
            .map_err(|e| TelegramError::ApiError(e.to_string()))?;

        Ok(ProgressHandle {
            chat_id,
            message_id: sent.id.0,
        })
    }

    async fn send_text_progress(&self, chat_id: i64) -> Result<ProgressHandle> {
        let sent = self
            .bot
            .send_message(ChatId(chat_id), texts::GENERATING)
            .await
            .map_err(|e| TelegramError::ApiError(e.to_string()))?;

        Ok(ProgressHandle {
            chat_id,
            message_id: sent.id.0,
        })
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, message: OutboundMessage) -> Result<()> {
        let content = if message.content.chars().count() > TELEGRAM_MAX_MESSAGE_LENGTH {
            tracing::warn!(
                chat_id = message.chat_id,
                original_length = message.content.len(),
                "Outbound message too long, truncating to {} characters",
                TELEGRAM_MAX_MESSAGE_LENGTH
            );
            truncate_html(&message.content, TELEGRAM_MAX_MESSAGE_LENGTH)
        } else {
            message.content
        };

        let mut request = self
            .bot
            .send_message(ChatId(message.chat_id), content)
            .parse_mode(ParseMode::Html);

        match message.keyboard {
            Some(Keyboard::Main) => request = request.reply_markup(main_keyboard()),
            Some(Keyboard::Modes(modes)) => request = request.reply_markup(modes_keyboard(&modes)),
            None => {}
        }

        match request.await {
            Ok(sent) => {
                tracing::debug!(
                    chat_id = message.chat_id,
                    message_id = sent.id.0,
                    "Sent message to Telegram"
                );
                Ok(())
            }
            Err(e) => {
                let error_msg = format!(
                    "Failed to send Telegram message to chat {}: {}",
                    message.chat_id, e
                );
                tracing::error!("{}", error_msg);
                Err(TelegramError::ApiError(error_msg).into())
            }
        }
    }

    async fn show_progress(&self, chat_id: i64) -> Result<ProgressHandle> {
        if let Some(path) = self.animation_path().await {
            match self.send_animation(chat_id, path).await {
                Ok(handle) => return Ok(handle),
                Err(e) => {
                    tracing::warn!(
                        chat_id = chat_id,
                        error = %e,
                        "Failed to send loading animation, falling back to text"
                    );
                }
            }
        }

        self.send_text_progress(chat_id).await
    }

    async fn clear_progress(&self, handle: ProgressHandle) -> Result<()> {
        self.bot
            .delete_message(ChatId(handle.chat_id), MessageId(handle.message_id))
            .await
            .map_err(|e| TelegramError::ApiError(e.to_string()))?;
        Ok(())
    }
}

/// Cuts HTML text to `max_chars` characters without leaving a partial
/// entity or tag at the end
fn truncate_html(content: &str, max_chars: usize) -> String {
    let mut truncated: String = content.chars().take(max_chars).collect();

    let open = truncated.rfind(['&', '<']);
    let close = truncated.rfind([';', '>']);
    if let Some(open) = open {
        if close.is_none_or(|close| close < open) {
            truncated.truncate(open);
        }
    }
    truncated
}

/// Persistent keyboard: two rows of two main buttons
pub fn main_keyboard() -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = MAIN_BUTTONS
        .chunks(2)
        .map(|row| row.iter().map(|text| KeyboardButton::new(*text)).collect())
        .collect();
    KeyboardMarkup::new(rows).resize_keyboard()
}

/// Inline keyboard with `mode:<Name>` buttons, `MODES_PER_ROW` per row
pub fn modes_keyboard(modes: &[Mode]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = modes
        .chunks(MODES_PER_ROW)
        .map(|row| {
            row.iter()
                .map(|mode| {
                    InlineKeyboardButton::callback(
                        mode.as_str(),
                        format!("{}{}", MODE_CALLBACK_PREFIX, mode.as_str()),
                    )
                })
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Telegram adapter: long-polls updates and routes them to the bot handler.
pub struct TelegramChannel {
    bot: Bot,
    handler: Arc<BotHandler>,
    messenger: Arc<TelegramMessenger>,
    shutdown_tx: Arc<RwLock<Option<mpsc::Sender<()>>>>,
}

impl TelegramChannel {
    /// Creates the adapter, validating the token format first.
    ///
    /// Token format should be: "123456789:ABCdefGHIjklMNOpqrsTUVwxyz"
    pub fn new(
        token: String,
        handler: Arc<BotHandler>,
        loading_animation: Option<PathBuf>,
    ) -> Result<Self> {
        if !is_valid_token_format(&token) {
            return Err(TelegramError::InvalidTokenFormat(
                "Token must be in format: digits:alphanumeric (e.g., 123456789:ABC...)".to_string(),
            )
            .into());
        }

        let bot = Bot::new(token);
        let messenger = Arc::new(TelegramMessenger::new(bot.clone(), loading_animation));

        Ok(Self {
            bot,
            handler,
            messenger,
            shutdown_tx: Arc::new(RwLock::new(None)),
        })
    }

    /// Shutdown the channel gracefully
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.write().await.take() {
            let _ = tx.send(()).await;
            tracing::info!("Telegram channel shutdown signal sent");
        }
        Ok(())
    }

    /// Converts a Telegram text message into an `InboundMessage`
    fn process_inbound_message(msg: &Message, user: &teloxide::types::User, text: &str) -> InboundMessage {
        let mut inbound = InboundMessage::new(msg.chat.id.0, user.id.0.to_string(), text)
            .with_metadata("message_id", serde_json::json!(msg.id.0));
        if let Some(username) = &user.username {
            inbound = inbound.with_metadata("username", serde_json::json!(username));
        }
        inbound.timestamp = msg.date;
        inbound
    }

    /// Spawns the dispatcher and returns once it is running
    pub async fn start(&self) -> Result<tokio::task::JoinHandle<()>> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        {
            let mut tx = self.shutdown_tx.write().await;
            *tx = Some(shutdown_tx);
        }

        let bot = self.bot.clone();
        let message_handler = Arc::clone(&self.handler);
        let callback_handler = Arc::clone(&self.handler);
        let messenger = Arc::clone(&self.messenger);

        let handle = tokio::spawn(async move {
            let messages = Update::filter_message().endpoint(move |msg: Message| {
                let handler = Arc::clone(&message_handler);
                let messenger = Arc::clone(&messenger);
                async move {
                    let Some(user) = msg.from.as_ref() else {
                        tracing::debug!("Message without user info, dropping");
                        return Ok::<(), TelegramError>(());
                    };
                    let Some(text) = msg.text() else {
                        tracing::debug!(chat_id = msg.chat.id.0, "Ignoring non-text message");
                        return Ok::<(), TelegramError>(());
                    };

                    let inbound = Self::process_inbound_message(&msg, user, text);
                    if let Err(e) = handler.handle_message(inbound, messenger.as_ref()).await {
                        tracing::error!(chat_id = msg.chat.id.0, "Failed to deliver reply: {}", e);
                    }

                    Ok::<(), TelegramError>(())
                }
            });

            let callbacks = Update::filter_callback_query().endpoint(
                move |query: CallbackQuery, bot: Bot| {
                    let handler = Arc::clone(&callback_handler);
                    async move {
                        let user_id = query.from.id.0.to_string();
                        let alert = match query.data.as_deref() {
                            Some(data) => handler.select_mode(&user_id, data).await,
                            None => texts::UNKNOWN_MODE.to_string(),
                        };

                        if let Err(e) = bot
                            .answer_callback_query(query.id.clone())
                            .text(alert)
                            .show_alert(true)
                            .await
                        {
                            tracing::error!(user_id = %user_id, "Failed to answer callback query: {}", e);
                        }

                        Ok::<(), TelegramError>(())
                    }
                },
            );

            let mut dispatcher = Dispatcher::builder(
                bot,
                dptree::entry().branch(messages).branch(callbacks),
            )
            .default_handler(|_upd| async move {
                tracing::debug!("Ignoring unsupported update");
            })
            .build();

            tokio::select! {
                _ = dispatcher.dispatch() => {
                    tracing::info!("Telegram dispatcher stopped");
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Telegram dispatcher received shutdown signal");
                }
            }
        });

        tracing::info!("Telegram channel connected and listening for messages");
        Ok(handle)
    }
}

/// Validates Telegram bot token format.
///
/// Expected format: "123456789:ABCdefGHIjklMNOpqrsTUVwxyz"
/// - Bot ID must be all digits
/// - Must contain exactly one colon separator
/// - Secret part must be non-empty
pub fn is_valid_token_format(token: &str) -> bool {
    let Some((bot_id, secret)) = token.split_once(':') else {
        return false;
    };

    !bot_id.is_empty()
        && bot_id.chars().all(|c| c.is_ascii_digit())
        && !secret.is_empty()
        && !secret.contains(':')
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::{InlineKeyboardButtonKind, KeyboardButton};

    #[test]
    fn test_valid_token_format() {
        assert!(is_valid_token_format("123456789:ABCdefGHIjklMNOpqrsTUVwxyz"));
        assert!(is_valid_token_format("987654321:xyz123"));
        assert!(is_valid_token_format("1:a"));
    }

    #[test]
    fn test_invalid_token_format() {
        assert!(!is_valid_token_format(""));
        assert!(!is_valid_token_format("invalid"));
        assert!(!is_valid_token_format("abc:def"));
        assert!(!is_valid_token_format("123:"));
        assert!(!is_valid_token_format("123:abc:def"));
        assert!(!is_valid_token_format(":secret"));
        assert!(!is_valid_token_format("123 456:secret"));
    }

    #[test]
    fn test_main_keyboard_layout() {
        let keyboard = main_keyboard();
        assert_eq!(keyboard.keyboard.len(), 2);
        assert_eq!(keyboard.keyboard[0], vec![
            KeyboardButton::new("📝 Start Chat"),
            KeyboardButton::new("❓ Help"),
        ]);
        assert_eq!(keyboard.keyboard[1][1], KeyboardButton::new("💼 Pro Access"));
    }

    #[test]
    fn test_modes_keyboard_rows() {
        let keyboard = modes_keyboard(&Mode::ALL);
        let rows = &keyboard.inline_keyboard;

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.len() == MODES_PER_ROW));
        assert_eq!(rows[0][2].text, "God");
        assert_eq!(
            rows[0][2].kind,
            InlineKeyboardButtonKind::CallbackData("mode:God".to_string())
        );
    }

    #[test]
    fn test_modes_keyboard_partial_row() {
        let keyboard = modes_keyboard(&Mode::ALL[..5]);
        assert_eq!(keyboard.inline_keyboard.len(), 2);
        assert_eq!(keyboard.inline_keyboard[1].len(), 1);
    }

    #[test]
    fn test_telegram_error_display() {
        let err = TelegramError::InvalidTokenFormat("test".to_string());
        assert!(err.to_string().contains("Invalid token format"));

        let err = TelegramError::ApiError("API failed".to_string());
        assert!(err.to_string().contains("API error"));
    }

    #[test]
    fn test_truncate_html_backs_off_partial_entity() {
        let content = "a &amp; b ".repeat(500);
        let truncated = truncate_html(&content, TELEGRAM_MAX_MESSAGE_LENGTH);

        assert!(truncated.chars().count() <= TELEGRAM_MAX_MESSAGE_LENGTH);
        assert_eq!(truncated.matches('&').count(), truncated.matches(';').count());
    }

    #[test]
    fn test_truncate_html_keeps_complete_text() {
        assert_eq!(truncate_html("x &lt; y", 8), "x &lt; y");
        assert_eq!(truncate_html("x &lt; y", 5), "x ");
        assert_eq!(truncate_html("<b>hi</b>", 5), "<b>hi");
        assert_eq!(truncate_html("<b>hi</b>", 7), "<b>hi");
    }

    #[tokio::test]
    async fn test_messenger_skips_missing_animation() {
        let messenger = TelegramMessenger::new(
            Bot::new("123:abc"),
            Some(PathBuf::from("/nonexistent/loading.gif")),
        );
        assert!(messenger.animation_path().await.is_none());
    }

    #[tokio::test]
    async fn test_messenger_uses_existing_animation() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("loading.gif");
        std::fs::write(&path, b"GIF89a").unwrap();

        let messenger = TelegramMessenger::new(Bot::new("123:abc"), Some(path.clone()));
        assert_eq!(messenger.animation_path().await, Some(&path));
    }
}
