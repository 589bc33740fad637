//! Chat turn orchestration
//!
//! A turn is admitted (per-user in-flight mark, quota), assembled into a
//! completion prompt from the active mode and recent history, sent to the
//! inference engine, and recorded in the session on success.

pub mod metrics;
pub mod prompt;
pub mod service;

pub use metrics::{GenerationMetrics, SLOW_GENERATION_P95_MS};
pub use prompt::{CONTEXT_TURNS, build_prompt, build_session_prompt};
pub use service::{ChatOutcome, ConversationService, PendingTurn, TurnStart};
