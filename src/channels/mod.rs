use crate::chat::OutboundMessage;
use anyhow::Result;
use async_trait::async_trait;

#[cfg(test)]
pub mod mock;
pub mod telegram;

pub use telegram::{TelegramChannel, TelegramError, TelegramMessenger};

/// Loading indicator shown while a reply is being generated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressHandle {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Outbound side of a messaging platform.
///
/// The bot core talks to users only through this trait, so it can be driven
/// by a recording fake in tests.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Delivers a reply, with its keyboard if any
    async fn send(&self, message: OutboundMessage) -> Result<()>;

    /// Posts the "generating" indicator to `chat_id`
    async fn show_progress(&self, chat_id: i64) -> Result<ProgressHandle>;

    /// Removes an indicator posted by `show_progress`
    async fn clear_progress(&self, handle: ProgressHandle) -> Result<()>;
}
