//! Retrying, caching, rate-limited model invocation.
//!
//! Every model call in a turn goes through [`RetryingCachingCaller`]. It
//! trims the inputs, consults the response cache, waits on the global
//! rate limiter before each attempt, retries failures with exponential
//! backoff, and converts exhaustion into a [`CallResult::Fallback`]
//! instead of an error.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use waypoint_config::OrchestratorConfig;
use waypoint_core::{
    AgentDefinition, ConversationContext, Invocation, Provider, Role, RunItem, TranscriptEntry,
};

use crate::cache::ResponseCache;
use crate::fingerprint::fingerprint;
use crate::rate_limit::RateLimiter;

/// Apology returned when every attempt failed.
pub const FALLBACK_MESSAGE: &str = "I apologize, but I'm experiencing high demand right now. \
Please try again in a moment. For immediate assistance, you can: \
1. Check your booking reference directly, 2. Contact our support line, or \
3. Try again in a few minutes.";

/// Outcome of one logical call. Never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    Ok(Invocation),
    Fallback(FallbackResult),
}

/// Synthetic result substituted when retries are exhausted.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackResult {
    pub message: String,
    /// The caller's input transcript, unchanged
    pub transcript: Vec<TranscriptEntry>,
}

impl CallResult {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    pub fn final_output(&self) -> &str {
        match self {
            Self::Ok(inv) => &inv.final_output,
            Self::Fallback(fb) => &fb.message,
        }
    }

    /// Produced items; always empty for a fallback.
    pub fn items(&self) -> &[RunItem] {
        match self {
            Self::Ok(inv) => &inv.items,
            Self::Fallback(_) => &[],
        }
    }

    pub fn canonical_transcript(&self) -> &[TranscriptEntry] {
        match self {
            Self::Ok(inv) => inv.canonical_transcript(),
            Self::Fallback(fb) => &fb.transcript,
        }
    }
}

/// Trimming and retry knobs.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub max_context_length: usize,
    pub max_history: usize,
    pub context_allow_list: Vec<String>,
    pub cache_responses: bool,
    pub fallback_message: String,
}

impl CallPolicy {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            max_context_length: config.max_context_length,
            max_history: config.max_conversation_history,
            context_allow_list: config.context_allow_list.clone(),
            cache_responses: config.cache_responses,
            fallback_message: FALLBACK_MESSAGE.to_string(),
        }
    }

    /// Backoff before retrying after failed attempt `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Keep the first entry plus the most recent `max_history - 1`, and cut
    /// every entry to `max_context_length` characters.
    ///
    /// Tool results at the start of the kept tail are dropped: the assistant
    /// entry that requested them fell outside the window, and a tool result
    /// without its call is rejected by chat-completion backends.
    pub fn trim_transcript(&self, transcript: &[TranscriptEntry]) -> Vec<TranscriptEntry> {
        let kept: Vec<&TranscriptEntry> = if transcript.len() <= self.max_history {
            transcript.iter().collect()
        } else {
            let tail = &transcript[transcript.len() - self.max_history.saturating_sub(1)..];
            let orphans = tail
                .iter()
                .take_while(|entry| entry.role == Role::Tool)
                .count();
            transcript
                .first()
                .into_iter()
                .chain(tail[orphans..].iter())
                .collect()
        };

        kept.into_iter()
            .map(|entry| entry.truncated(self.max_context_length))
            .collect()
    }

    pub fn trim_context(&self, context: &ConversationContext) -> ConversationContext {
        context.subset(&self.context_allow_list)
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::from_config(&OrchestratorConfig::default())
    }
}

/// Composes the rate limiter, response cache, and retry loop around a
/// [`Provider`]. The limiter and cache are shared references so one pair
/// can serve every orchestrator in the process.
pub struct RetryingCachingCaller {
    provider: Arc<dyn Provider>,
    rate_limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    policy: CallPolicy,
}

impl RetryingCachingCaller {
    pub fn new(
        provider: Arc<dyn Provider>,
        rate_limiter: Arc<RateLimiter>,
        cache: Arc<ResponseCache>,
        policy: CallPolicy,
    ) -> Self {
        Self {
            provider,
            rate_limiter,
            cache,
            policy,
        }
    }

    /// Build the limiter and cache from orchestrator settings.
    pub fn from_config(provider: Arc<dyn Provider>, config: &OrchestratorConfig) -> Self {
        Self::new(
            provider,
            Arc::new(RateLimiter::new(Duration::from_millis(
                config.rate_limit_delay_ms,
            ))),
            Arc::new(ResponseCache::new(Duration::from_secs(config.cache_ttl_secs))),
            CallPolicy::from_config(config),
        )
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn policy(&self) -> &CallPolicy {
        &self.policy
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn call(
        &self,
        agent: &AgentDefinition,
        transcript: &[TranscriptEntry],
        context: &ConversationContext,
    ) -> CallResult {
        let trimmed = self.policy.trim_transcript(transcript);
        let scoped_context = self.policy.trim_context(context);
        let key = fingerprint(&agent.name, &agent.model_id, &trimmed, &scoped_context);

        if self.policy.cache_responses {
            if let Some(hit) = self.cache.get(&key) {
                debug!(agent = %agent.name, key = %key, "Cache hit");
                return CallResult::Ok(hit);
            }
            debug!(agent = %agent.name, key = %key, "Cache miss");
        }

        let max_attempts = self.policy.max_retries.max(1);
        for attempt in 0..max_attempts {
            self.rate_limiter.wait().await;

            match self.provider.invoke(agent, &trimmed, &scoped_context).await {
                Ok(invocation) => {
                    if self.policy.cache_responses {
                        self.cache.put(key, invocation.clone());
                    }
                    return CallResult::Ok(invocation);
                }
                Err(e) => {
                    warn!(
                        agent = %agent.name,
                        provider = %self.provider.name(),
                        attempt = attempt + 1,
                        max_attempts,
                        error = %e,
                        "Model call failed"
                    );
                    if attempt + 1 < max_attempts {
                        let delay = self.policy.backoff(attempt);
                        debug!(delay_ms = delay.as_millis() as u64, "Backing off before retry");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        error!(
            agent = %agent.name,
            attempts = max_attempts,
            "All attempts failed, returning fallback"
        );
        CallResult::Fallback(FallbackResult {
            message: self.policy.fallback_message.clone(),
            transcript: transcript.to_vec(),
        })
    }
}
