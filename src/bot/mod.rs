//! Bot command surface
//!
//! Turns inbound chat text and keyboard callbacks into session and
//! conversation operations, and renders the replies.

pub mod commands;
pub mod handler;
pub mod texts;

pub use commands::{Command, MAIN_BUTTONS, MODE_CALLBACK_PREFIX};
pub use handler::BotHandler;
