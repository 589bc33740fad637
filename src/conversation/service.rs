use std::sync::Arc;
use std::time::Instant;

use crate::conversation::metrics::{GenerationMetrics, SLOW_GENERATION_P95_MS};
use crate::conversation::prompt::{CONTEXT_TURNS, build_prompt};
use crate::policy::{Mode, ModeRegistry, QuotaDecision, QuotaPolicy};
use crate::providers::{GenerationRequest, LlmProvider};
use crate::session::{GenerationGuard, SessionManager, Turn};
use crate::utils::{AzaleaError, Result};

/// Outcome of the admission phase of a chat turn
#[derive(Debug)]
pub enum TurnStart {
    /// A generation for this user is already running; nothing was counted
    Busy,
    /// The quota is exhausted; the session is unchanged
    Denied,
    /// Quota consumed, prompt assembled; ready for inference
    Ready(PendingTurn),
}

/// Result of [`ConversationService::chat`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Busy,
    Denied,
    Reply(String),
}

/// An admitted chat turn waiting for its generation.
///
/// Holds the per-user generation mark until it is completed or dropped.
#[derive(Debug)]
pub struct PendingTurn {
    guard: GenerationGuard,
    user_text: String,
    mode: Mode,
    request: GenerationRequest,
}

impl PendingTurn {
    pub fn user_id(&self) -> &str {
        self.guard.user_id()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }
}

/// Runs chat turns: quota, mode resolution, prompt assembly, inference and
/// history bookkeeping.
pub struct ConversationService {
    sessions: Arc<SessionManager>,
    provider: Arc<dyn LlmProvider>,
    registry: ModeRegistry,
    quota: QuotaPolicy,
    metrics: GenerationMetrics,
}

impl ConversationService {
    pub fn new(
        sessions: Arc<SessionManager>,
        provider: Arc<dyn LlmProvider>,
        registry: ModeRegistry,
        quota: QuotaPolicy,
    ) -> Self {
        Self {
            sessions,
            provider,
            registry,
            quota,
            metrics: GenerationMetrics::new(),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn registry(&self) -> &ModeRegistry {
        &self.registry
    }

    pub fn quota(&self) -> &QuotaPolicy {
        &self.quota
    }

    pub fn metrics(&self) -> &GenerationMetrics {
        &self.metrics
    }

    /// Admits a chat turn for `user_id`.
    ///
    /// The quota decision is persisted before any inference happens, so a
    /// consumed unit stays consumed even if generation later fails.
    pub async fn begin_turn(&self, user_id: &str, text: &str) -> Result<TurnStart> {
        let Some(guard) = self.sessions.try_begin_generation(user_id) else {
            tracing::info!(user_id = %user_id, "Turn rejected, generation in flight");
            return Ok(TurnStart::Busy);
        };

        let admission = self
            .sessions
            .update(user_id, |session| match self.quota.check(user_id, session) {
                QuotaDecision::Denied => None,
                QuotaDecision::Allowed => {
                    let recent: Vec<Turn> =
                        session.recent_turns(CONTEXT_TURNS).cloned().collect();
                    Some((session.mode, session.message_count, recent))
                }
            })
            .await?;

        let Some((mode, count, recent)) = admission else {
            tracing::info!(
                user_id = %user_id,
                limit = self.quota.daily_limit(),
                "Quota exhausted"
            );
            return Ok(TurnStart::Denied);
        };

        let mode_config = self.registry.resolve(mode).await;
        let prompt = build_prompt(&mode_config.system_prompt, &recent, text);

        tracing::debug!(
            user_id = %user_id,
            mode = %mode,
            count = count,
            context_turns = recent.len(),
            prompt_chars = prompt.len(),
            "Turn admitted"
        );

        Ok(TurnStart::Ready(PendingTurn {
            guard,
            user_text: text.to_string(),
            mode,
            request: GenerationRequest::new(
                prompt,
                mode_config.system_prompt,
                mode_config.temperature,
            ),
        }))
    }

    /// Runs inference for an admitted turn and records it in history.
    ///
    /// A generation failure returns `AzaleaError::Generation` and leaves the
    /// history untouched. A failed save after a successful generation
    /// returns the storage error; the turn stays in memory.
    pub async fn complete_turn(&self, pending: PendingTurn) -> Result<String> {
        let PendingTurn {
            guard,
            user_text,
            mode,
            request,
        } = pending;
        let user_id = guard.user_id().to_string();

        let start = Instant::now();
        let result = self.provider.generate(request).await;
        let elapsed = start.elapsed();

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    provider = self.provider.provider_name(),
                    error = %e,
                    "Generation failed"
                );
                return Err(AzaleaError::Generation(e));
            }
        };

        self.record_latency(&user_id, mode, elapsed, response.total_tokens());

        let reply = response.content.trim().to_string();
        let turn = Turn::new(user_text, reply.clone());
        self.sessions
            .update(&user_id, |session| session.push_turn(turn))
            .await?;

        drop(guard);
        Ok(reply)
    }

    /// Admits and completes a turn in one call
    pub async fn chat(&self, user_id: &str, text: &str) -> Result<ChatOutcome> {
        match self.begin_turn(user_id, text).await? {
            TurnStart::Busy => Ok(ChatOutcome::Busy),
            TurnStart::Denied => Ok(ChatOutcome::Denied),
            TurnStart::Ready(pending) => self.complete_turn(pending).await.map(ChatOutcome::Reply),
        }
    }

    fn record_latency(
        &self,
        user_id: &str,
        mode: Mode,
        elapsed: std::time::Duration,
        tokens: Option<u32>,
    ) {
        self.metrics.record(elapsed);

        let (Some(p95), Some(avg)) = (self.metrics.percentile_95(), self.metrics.average()) else {
            return;
        };

        tracing::info!(
            user_id = %user_id,
            mode = %mode,
            model = %self.provider.default_model(),
            generation_ms = elapsed.as_millis(),
            tokens = tokens,
            p95_ms = p95,
            avg_ms = avg,
            samples = self.metrics.sample_count(),
            "Generation completed"
        );

        if p95 > SLOW_GENERATION_P95_MS {
            tracing::warn!(
                p95_ms = p95,
                threshold_ms = SLOW_GENERATION_P95_MS,
                "Generation latency 95th percentile is high"
            );
        }
    }
}
