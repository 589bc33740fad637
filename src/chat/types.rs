use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::policy::Mode;

/// Longest chat text accepted from a user, in characters
pub const MAX_CONTENT_LENGTH: usize = 4000;

/// Text received from a user in a chat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub user_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: HashMap<String, Value>,
}

impl InboundMessage {
    pub fn new(chat_id: i64, user_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            chat_id,
            user_id: user_id.into(),
            content: content.into(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Trims the content and caps it at `MAX_CONTENT_LENGTH` characters.
    /// Returns false if nothing is left.
    pub fn sanitize(&mut self) -> bool {
        let trimmed = self.content.trim();
        if trimmed.is_empty() {
            return false;
        }

        if trimmed.chars().count() > MAX_CONTENT_LENGTH {
            tracing::warn!(
                user_id = %self.user_id,
                chat_id = self.chat_id,
                original_length = self.content.len(),
                "Message too long, truncating to {}",
                MAX_CONTENT_LENGTH
            );
            self.content = trimmed.chars().take(MAX_CONTENT_LENGTH).collect();
        } else if trimmed.len() != self.content.len() {
            self.content = trimmed.to_string();
        }

        true
    }

    /// First 50 characters of the content, for logs
    pub fn preview(&self) -> String {
        self.content.chars().take(50).collect()
    }
}

/// Reply keyboard attached to an outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Keyboard {
    /// Persistent keyboard with the four main buttons
    Main,
    /// Inline keyboard with one `mode:<Name>` button per mode
    Modes(Vec<Mode>),
}

/// Reply to a chat. `content` is Telegram HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub chat_id: i64,
    pub content: String,
    pub keyboard: Option<Keyboard>,
}

impl OutboundMessage {
    pub fn new(chat_id: i64, content: impl Into<String>) -> Self {
        Self {
            chat_id,
            content: content.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}
