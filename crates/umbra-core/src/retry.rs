//! Retry/rate policy (§4.K): exponential backoff with jitter, honoring a
//! rate limiter's `Retry-After` hint.
//!
//! This module is pure: it computes a delay but never sleeps. Callers (the
//! scanner) own the actual suspension point and the source of jitter
//! randomness, so this stays deterministically testable.

use std::time::Duration;

use crate::schema::RetryConfig;

/// One outcome a retryable call can report to the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// A rate-limit response (HTTP 429), with an optional `Retry-After` in
    /// seconds from the response.
    RateLimited {
        /// Seconds to wait, if the response specified one.
        retry_after_secs: Option<u64>,
    },
    /// Any other error; the policy never retries these (§7, §9).
    Other,
}

/// Whether to retry, and if so, how long to wait before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after waiting this long.
    RetryAfter(Duration),
    /// Give up; the caller should surface the error.
    GiveUp,
}

/// Decide whether attempt number `attempt` (0-indexed) should retry, and
/// compute its delay.
///
/// `jitter_sample` must be a uniform draw from `[0.0, 1.0)`; the caller owns
/// the CSPRNG so this function stays pure and unit-testable.
#[must_use]
pub fn decide(
    config: &RetryConfig,
    attempt: u32,
    outcome: RetryOutcome,
    jitter_sample: f64,
) -> RetryDecision {
    if attempt >= config.max_retries {
        return RetryDecision::GiveUp;
    }

    match outcome {
        RetryOutcome::Other => RetryDecision::GiveUp,
        RetryOutcome::RateLimited { retry_after_secs } => {
            if let Some(secs) = retry_after_secs {
                let requested = Duration::from_secs(secs);
                let cap = Duration::from_millis(config.cap_ms);
                return RetryDecision::RetryAfter(requested.min(cap));
            }
            RetryDecision::RetryAfter(exponential_delay(config, attempt, jitter_sample))
        }
    }
}

/// `base * 2^attempt + jitter * 0.3 * base * 2^attempt`, capped at `cap_ms`.
fn exponential_delay(config: &RetryConfig, attempt: u32, jitter_sample: f64) -> Duration {
    let base_ms = config.base_ms;
    let multiplier = 2_u64.checked_pow(attempt).unwrap_or(u64::MAX);
    let exponential_ms = base_ms.saturating_mul(multiplier);

    #[allow(
        clippy::float_arithmetic,
        clippy::as_conversions,
        reason = "jitter is a display/telemetry quantity, not a security-relevant value"
    )]
    let jitter_ms = (exponential_ms as f64) * config.jitter * jitter_sample.clamp(0.0, 1.0);
    #[allow(clippy::as_conversions, reason = "jitter_ms is always non-negative and bounded by exponential_ms")]
    let total_ms = exponential_ms.saturating_add(jitter_ms as u64);

    Duration::from_millis(total_ms).min(Duration::from_millis(config.cap_ms))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    fn config() -> RetryConfig {
        RetryConfig { max_retries: 5, base_ms: 1_000, cap_ms: 30_000, jitter: 0.3 }
    }

    #[test]
    fn stops_after_max_retries() {
        let decision = decide(&config(), 5, RetryOutcome::RateLimited { retry_after_secs: None }, 0.0);
        assert_eq!(decision, RetryDecision::GiveUp);
    }

    #[test]
    fn non_rate_limit_errors_never_retry() {
        let decision = decide(&config(), 0, RetryOutcome::Other, 0.0);
        assert_eq!(decision, RetryDecision::GiveUp);
    }

    #[test]
    fn retry_after_header_is_honored_and_capped() {
        let decision = decide(&config(), 0, RetryOutcome::RateLimited { retry_after_secs: Some(5) }, 0.0);
        assert_eq!(decision, RetryDecision::RetryAfter(Duration::from_secs(5)));

        let decision = decide(&config(), 0, RetryOutcome::RateLimited { retry_after_secs: Some(1_000) }, 0.0);
        assert_eq!(decision, RetryDecision::RetryAfter(Duration::from_millis(30_000)));
    }

    #[test]
    fn exponential_backoff_grows_and_respects_cap() {
        let RetryDecision::RetryAfter(delay_0) =
            decide(&config(), 0, RetryOutcome::RateLimited { retry_after_secs: None }, 0.0)
        else {
            panic!("expected retry");
        };
        let RetryDecision::RetryAfter(delay_3) =
            decide(&config(), 3, RetryOutcome::RateLimited { retry_after_secs: None }, 0.0)
        else {
            panic!("expected retry");
        };
        assert!(delay_3 > delay_0);
        assert!(delay_3 <= Duration::from_millis(30_000));
    }

    #[test]
    fn jitter_sample_increases_delay_within_bound() {
        let RetryDecision::RetryAfter(no_jitter) =
            decide(&config(), 1, RetryOutcome::RateLimited { retry_after_secs: None }, 0.0)
        else {
            panic!("expected retry");
        };
        let RetryDecision::RetryAfter(full_jitter) =
            decide(&config(), 1, RetryOutcome::RateLimited { retry_after_secs: None }, 0.999)
        else {
            panic!("expected retry");
        };
        assert!(full_jitter >= no_jitter);
    }
}
