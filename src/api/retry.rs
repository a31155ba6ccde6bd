// Exponential backoff for rate-limited (429) requests.
//
// The server answers 429 when we post or poll too quickly. Those calls are
// retried with exponentially growing delays (plus jitter so several bots
// sharing an IP don't wake up in lockstep). Every other error is returned
// to the caller immediately.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{DramaError, Result};

/// Backoff parameters for rate-limited requests.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `None` retries forever.
    pub max_retries: Option<u32>,
    /// Delay before the first retry; doubles with each further retry.
    pub base_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
    /// Scale each delay by a factor in 0.75..1.25.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: Some(8),
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Un-jittered delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn allows(&self, retry: u32) -> bool {
        self.max_retries.is_none_or(|max| retry <= max)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter {
            return delay;
        }
        // Cheap jitter from the clock's nanosecond component; no need for a
        // full RNG here.
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();
        let jitter_factor = 0.75 + (nanos % 500) as f64 / 1000.0; // 0.75 to 1.25
        Duration::from_secs_f64(delay.as_secs_f64() * jitter_factor)
    }
}

/// Retry an async operation with exponential backoff on rate-limit errors.
///
/// Non-rate-limit errors are returned as-is. When the policy's ceiling is
/// reached the last 429 is wrapped in `RetriesExhausted`.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retry = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_rate_limited() => return Err(err),
            Err(err) => {
                retry += 1;
                if !policy.allows(retry) {
                    return Err(DramaError::RetriesExhausted {
                        attempts: retry,
                        last: Box::new(err),
                    });
                }

                let delay = policy.jittered(policy.delay_for(retry));
                warn!(
                    attempt = retry,
                    max_retries = ?policy.max_retries,
                    backoff_secs = delay.as_secs_f64(),
                    "Rate limited (429), retrying in {:.1}s",
                    delay.as_secs_f64(),
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
