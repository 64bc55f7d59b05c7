//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Provider instances are shared immutable capabilities; clone them freely.
//! [`Gateway`] wraps a provider with the retry policy; it is the only thing
//! the chat layer talks to.

pub mod providers;

use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::config::OpenAiConfig;
use crate::conversation::Turn;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("missing credential: {0} is not set")]
    MissingCredential(String),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("credential rejected (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("upstream returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Whether another attempt might succeed without changing anything.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(_)
            | ProviderError::Timeout(_)
            | ProviderError::RateLimited(_) => true,
            ProviderError::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new arm in each method.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
}

impl LlmProvider {
    /// Send the full transcript and return the top reply as an assistant turn.
    pub async fn complete(&self, transcript: &[Turn]) -> Result<Turn, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.complete(transcript).await,
            LlmProvider::OpenAiCompatible(p) => p.complete(transcript).await,
        }
    }

    /// Model identifier sent with every request.
    pub fn model(&self) -> &str {
        match self {
            LlmProvider::Dummy(_) => "dummy",
            LlmProvider::OpenAiCompatible(p) => p.model(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Dummy(_) => "dummy",
            LlmProvider::OpenAiCompatible(_) => "openai",
        }
    }
}

// ── Retry ─────────────────────────────────────────────────────────────────────

/// Bounded exponential backoff, applied to transient failures only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first. `0` means a single attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const NONE: RetryPolicy = RetryPolicy { max_retries: 0, base_delay: Duration::ZERO };

    pub fn from_config(config: &OpenAiConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

/// Completion gateway — a provider plus its retry policy.
#[derive(Debug, Clone)]
pub struct Gateway {
    provider: LlmProvider,
    retry: RetryPolicy,
}

impl Gateway {
    pub fn new(provider: LlmProvider, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    /// Obtain exactly one assistant turn for `transcript`.
    ///
    /// Transient failures are retried up to `max_retries` times; the last
    /// error is returned once the budget is spent. Permanent failures
    /// (credential, malformed response, 4xx) return immediately.
    pub async fn complete(&self, transcript: &[Turn]) -> Result<Turn, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.provider.complete(transcript).await {
                Ok(turn) => return Ok(turn),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient LLM failure — retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ProviderError::Transport("refused".into()).is_transient());
        assert!(ProviderError::Timeout(5).is_transient());
        assert!(ProviderError::RateLimited("slow down".into()).is_transient());
        assert!(ProviderError::Upstream { status: 503, message: String::new() }.is_transient());

        assert!(!ProviderError::Upstream { status: 400, message: String::new() }.is_transient());
        assert!(!ProviderError::Unauthorized { status: 401, message: String::new() }.is_transient());
        assert!(!ProviderError::MalformedResponse("no choices".into()).is_transient());
        assert!(!ProviderError::MissingCredential("OPENAI_API_KEY".into()).is_transient());
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy { max_retries: 3, base_delay: Duration::from_millis(100) };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let policy = RetryPolicy { max_retries: u32::MAX, base_delay: Duration::from_secs(u64::MAX / 2) };
        assert_eq!(policy.delay_for(40), Duration::MAX);
    }

    #[tokio::test]
    async fn gateway_passes_through_dummy_reply() {
        let gw = Gateway::new(LlmProvider::Dummy(providers::dummy::DummyProvider), RetryPolicy::NONE);
        let reply = gw.complete(&[Turn::user("ping")]).await.unwrap();
        assert_eq!(reply, Turn::assistant("[echo] ping"));
        assert_eq!(gw.provider().name(), "dummy");
    }
}
