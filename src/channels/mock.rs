//! Recording messenger for handler tests

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::channels::{Messenger, ProgressHandle};
use crate::chat::OutboundMessage;

/// Everything the bot asked the platform to do, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Message(OutboundMessage),
    ProgressShown(ProgressHandle),
    ProgressCleared(ProgressHandle),
}

#[derive(Default)]
pub struct MockMessenger {
    deliveries: Mutex<Vec<Delivery>>,
    next_id: Mutex<i32>,
}

impl MockMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    /// Sent messages only, ignoring indicators
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.deliveries()
            .into_iter()
            .filter_map(|d| match d {
                Delivery::Message(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self) -> Option<String> {
        self.messages().last().map(|m| m.content.clone())
    }

    fn push(&self, delivery: Delivery) {
        self.deliveries.lock().unwrap().push(delivery);
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send(&self, message: OutboundMessage) -> Result<()> {
        self.push(Delivery::Message(message));
        Ok(())
    }

    async fn show_progress(&self, chat_id: i64) -> Result<ProgressHandle> {
        let message_id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            *next
        };
        let handle = ProgressHandle {
            chat_id,
            message_id,
        };
        self.push(Delivery::ProgressShown(handle));
        Ok(handle)
    }

    async fn clear_progress(&self, handle: ProgressHandle) -> Result<()> {
        self.push(Delivery::ProgressCleared(handle));
        Ok(())
    }
}
