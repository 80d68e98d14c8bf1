//! Shared retry policy (§4.4/§4.5): exponential backoff with optional
//! jitter, applied around remote Embedding and LLM provider calls. Both
//! capability interfaces document the same parameter set, so one policy
//! backs both rather than duplicating the backoff math per provider.

use std::time::Duration;

use deepwiki_domain::error::ProviderError;
use rand::Rng;
use tracing::warn;

/// `max_attempts`, `base_delay`, `max_delay`, `exponential_base`, `jitter`
/// as named in §4.4. Attempt `n` (1-based) sleeps
/// `min(base * exponential_base^n, max) ± uniform(0, delay)` when jitter is
/// enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.exponential_base.powi(attempt as i32);
        let scaled = self.base_delay.as_secs_f64() * exp;
        let capped = scaled.min(self.max_delay.as_secs_f64());
        let delay = if self.jitter {
            let jittered = rand::rng().random_range(0.0..capped.max(f64::EPSILON));
            jittered
        } else {
            capped
        };
        Duration::from_secs_f64(delay.max(0.0))
    }

    /// Only connection errors and explicit rate limiting are worth retrying;
    /// `ModelNotFoundError` is terminal (§7) and `Cancelled`/`Invocation`
    /// failures are structural, not transient.
    fn is_retryable(error: &ProviderError) -> bool {
        matches!(error, ProviderError::Connection(_) | ProviderError::RateLimited { .. })
    }

    /// Runs `op`, retrying on transient failures up to `max_attempts` times
    /// total. Returns the last error once attempts are exhausted.
    pub async fn retry<F, Fut, T>(&self, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt + 1 < self.max_attempts && Self::is_retryable(&error) => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(attempt, ?delay, %error, "retrying after transient provider failure");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
