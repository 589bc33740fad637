pub mod types;

pub use types::{InboundMessage, Keyboard, MAX_CONTENT_LENGTH, OutboundMessage};
