use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::policy::Mode;

/// Maximum number of turns kept per session
pub const MAX_HISTORY: usize = 20;

/// Every session, keyed by user identity
pub type SessionMap = BTreeMap<String, Session>;

/// One exchange: what the user said and what the model answered.
///
/// Serialized as a two-element array `["question", "answer"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn(pub String, pub String);

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self(question.into(), answer.into())
    }

    pub fn question(&self) -> &str {
        &self.0
    }

    pub fn answer(&self) -> &str {
        &self.1
    }
}

/// Per-user conversation and quota state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "count", default)]
    pub message_count: u32,
    #[serde(default, deserialize_with = "Mode::deserialize_lenient")]
    pub mode: Mode,
    #[serde(default)]
    pub is_pro: bool,
    #[serde(default)]
    pub history: VecDeque<Turn>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            message_count: 0,
            mode: Mode::default(),
            is_pro: false,
            history: VecDeque::with_capacity(MAX_HISTORY),
        }
    }

    /// Appends a turn, evicting the oldest ones past `MAX_HISTORY`
    pub fn push_turn(&mut self, turn: Turn) {
        self.history.push_back(turn);
        self.enforce_history_limit();
    }

    pub fn enforce_history_limit(&mut self) {
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
    }

    /// The last `n` turns in chronological order
    pub fn recent_turns(&self, n: usize) -> impl Iterator<Item = &Turn> {
        self.history.iter().skip(self.history.len().saturating_sub(n))
    }

    /// Forgets the conversation but keeps quota, mode and pro status
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Restarts the quota window and the conversation.
    ///
    /// The mode goes back to the default; pro status is granted outside the
    /// bot and survives a reset.
    pub fn reset(&mut self) {
        self.message_count = 0;
        self.mode = Mode::default();
        self.history.clear();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the session for `user_id`, inserting a fresh one on first contact.
///
/// Only touches the map; callers persist afterwards.
pub fn ensure_session<'a>(sessions: &'a mut SessionMap, user_id: &str) -> &'a mut Session {
    sessions.entry(user_id.to_string()).or_insert_with(|| {
        tracing::debug!(user_id = %user_id, "Creating new session");
        Session::new()
    })
}
