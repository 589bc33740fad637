use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;

use crate::bot::commands::{Command, parse_mode_callback};
use crate::bot::texts;
use crate::channels::Messenger;
use crate::chat::{InboundMessage, Keyboard, OutboundMessage};
use crate::conversation::{ConversationService, TurnStart};
use crate::policy::Mode;
use crate::session::Session;
use crate::utils::AzaleaError;

/// Maps user commands onto session and conversation operations.
///
/// Every reply goes back through the `Messenger` passed in, so a single
/// handler serves all chats.
pub struct BotHandler {
    service: Arc<ConversationService>,
    pro_url: String,
}

impl BotHandler {
    pub fn new(service: Arc<ConversationService>, pro_url: impl Into<String>) -> Self {
        Self {
            service,
            pro_url: pro_url.into(),
        }
    }

    pub fn service(&self) -> &Arc<ConversationService> {
        &self.service
    }

    /// Handles one text message. Errors are delivery failures only;
    /// storage and generation failures are reported to the user.
    pub async fn handle_message(&self, mut msg: InboundMessage, messenger: &dyn Messenger) -> Result<()> {
        if !msg.sanitize() {
            tracing::debug!(user_id = %msg.user_id, "Ignoring empty message");
            return Ok(());
        }

        let command = Command::parse(&msg.content);
        tracing::info!(
            user_id = %msg.user_id,
            chat_id = msg.chat_id,
            command = command.name(),
            content_preview = %msg.preview(),
            "Received message"
        );

        let chat_id = msg.chat_id;
        let user_id = msg.user_id.as_str();
        let sessions = self.service.sessions();

        let reply = match command {
            Command::Start => match sessions.update(user_id, |_| ()).await {
                Ok(()) => OutboundMessage::new(chat_id, texts::WELCOME).with_keyboard(Keyboard::Main),
                Err(e) => self.storage_failure(chat_id, user_id, &e),
            },
            Command::Help => {
                let modes = self.service.registry().modes().collect();
                OutboundMessage::new(chat_id, texts::HELP).with_keyboard(Keyboard::Modes(modes))
            }
            Command::NewSession => {
                self.mutate(chat_id, user_id, Session::clear_history, texts::MEMORY_CLEARED)
                    .await
            }
            Command::Clear => {
                self.mutate(chat_id, user_id, Session::reset, texts::ALL_DATA_RESET)
                    .await
            }
            Command::History => {
                let text = match sessions.get(user_id).await {
                    Some(session) => texts::history(&session.history),
                    None => texts::NO_HISTORY.to_string(),
                };
                OutboundMessage::new(chat_id, text)
            }
            Command::Pro => OutboundMessage::new(chat_id, texts::pro_access(&self.pro_url)),
            Command::Intro => OutboundMessage::new(chat_id, texts::INTRO),
            Command::ShowMode => {
                let session = sessions.get(user_id).await.unwrap_or_default();
                let config = self.service.registry().resolve(session.mode).await;
                let remaining = self.service.quota().remaining(user_id, &session);
                OutboundMessage::new(chat_id, texts::current_mode(session.mode, &config, remaining))
            }
            Command::Grant(target) => self.set_pro(chat_id, user_id, &target, true).await,
            Command::Revoke(target) => self.set_pro(chat_id, user_id, &target, false).await,
            Command::Chat(text) => return self.chat(chat_id, user_id, &text, messenger).await,
        };

        messenger.send(reply).await
    }

    /// Handles an inline keyboard callback. Returns the alert text to show.
    pub async fn select_mode(&self, user_id: &str, data: &str) -> String {
        let Some(mode) = parse_mode_callback(data).and_then(|name| Mode::from_str(name).ok())
        else {
            tracing::warn!(user_id = %user_id, data = %data, "Unknown mode selected");
            return texts::UNKNOWN_MODE.to_string();
        };

        match self
            .service
            .sessions()
            .update(user_id, |session| session.mode = mode)
            .await
        {
            Ok(()) => {
                tracing::info!(user_id = %user_id, mode = %mode, "Mode changed");
                texts::mode_set(mode)
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to persist mode change");
                texts::storage_error(&e)
            }
        }
    }

    async fn chat(
        &self,
        chat_id: i64,
        user_id: &str,
        text: &str,
        messenger: &dyn Messenger,
    ) -> Result<()> {
        let pending = match self.service.begin_turn(user_id, text).await {
            Ok(TurnStart::Ready(pending)) => pending,
            Ok(TurnStart::Busy) => {
                return messenger
                    .send(OutboundMessage::new(chat_id, texts::STILL_GENERATING))
                    .await;
            }
            Ok(TurnStart::Denied) => {
                return messenger
                    .send(OutboundMessage::new(chat_id, texts::LIMIT_REACHED))
                    .await;
            }
            Err(e) => return messenger.send(self.storage_failure(chat_id, user_id, &e)).await,
        };

        let progress = match messenger.show_progress(chat_id).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(chat_id = chat_id, error = %e, "Failed to show progress indicator");
                None
            }
        };

        let result = self.service.complete_turn(pending).await;

        if let Some(handle) = progress {
            if let Err(e) = messenger.clear_progress(handle).await {
                tracing::warn!(chat_id = chat_id, error = %e, "Failed to clear progress indicator");
            }
        }

        let content = match result {
            Ok(reply) => texts::reply(&reply),
            Err(err) => match &err {
                AzaleaError::Generation(e) => {
                    if let Some(hint) = err.suggestion() {
                        tracing::warn!(user_id = %user_id, "{}", hint);
                    }
                    texts::generation_error(e)
                }
                _ => return messenger.send(self.storage_failure(chat_id, user_id, &err)).await,
            },
        };

        messenger.send(OutboundMessage::new(chat_id, content)).await
    }

    async fn mutate(
        &self,
        chat_id: i64,
        user_id: &str,
        f: fn(&mut Session),
        confirmation: &str,
    ) -> OutboundMessage {
        match self.service.sessions().update(user_id, f).await {
            Ok(()) => OutboundMessage::new(chat_id, confirmation),
            Err(e) => self.storage_failure(chat_id, user_id, &e),
        }
    }

    async fn set_pro(&self, chat_id: i64, user_id: &str, target: &str, is_pro: bool) -> OutboundMessage {
        let command = if is_pro { "grant" } else { "revoke" };

        if !self.service.quota().is_admin(user_id) {
            tracing::warn!(user_id = %user_id, command = command, "Admin command from non-admin");
            return OutboundMessage::new(chat_id, texts::ADMINS_ONLY);
        }

        if target.is_empty() || !target.chars().all(|c| c.is_ascii_digit()) {
            return OutboundMessage::new(chat_id, texts::usage(command));
        }

        match self
            .service
            .sessions()
            .update(target, |session| session.is_pro = is_pro)
            .await
        {
            Ok(()) => {
                tracing::info!(admin = %user_id, target = %target, is_pro = is_pro, "Pro status changed");
                let text = if is_pro {
                    texts::pro_granted(target)
                } else {
                    texts::pro_revoked(target)
                };
                OutboundMessage::new(chat_id, text)
            }
            Err(e) => self.storage_failure(chat_id, user_id, &e),
        }
    }

    fn storage_failure(&self, chat_id: i64, user_id: &str, error: &AzaleaError) -> OutboundMessage {
        tracing::error!(
            user_id = %user_id,
            error = %error,
            hint = error.suggestion().unwrap_or_default(),
            "Failed to persist session"
        );
        OutboundMessage::new(chat_id, texts::storage_error(error))
    }
}
