//! Retry logic with exponential backoff and full jitter.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Invocations allowed under [`default_should_retry`] regardless of the
/// policy's `max_retries`.
const DEFAULT_CLASSIFIER_MAX_ATTEMPTS: u32 = 3;

/// Status codes and phrases that mark a client error.
const NON_RETRYABLE_CODES: &[&str] = &["400", "401", "403", "404"];
const NON_RETRYABLE_PHRASES: &[&str] = &["bad request", "unauthorized", "forbidden", "not found"];

/// Status codes and phrases that mark a transient failure.
const RETRYABLE_CODES: &[&str] = &["429", "500", "502", "503", "504"];
const RETRYABLE_PHRASES: &[&str] = &[
    "network",
    "timeout",
    "timed out",
    "connection refused",
    "connection reset",
    "econnrefused",
    "too many requests",
    "service unavailable",
    "bad gateway",
];

/// Retry policy with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    #[serde(with = "crate::duration_ms")]
    pub initial_delay: Duration,
    /// Multiplier applied per retry
    pub backoff_factor: f64,
    /// Upper bound on a single delay
    #[serde(with = "crate::duration_ms")]
    pub max_delay: Duration,
    /// Sleep a uniform random time in `[0, delay]` instead of `delay`
    pub jitter: bool,
}

impl RetryPolicy {
    /// Create a new retry policy with jitter enabled.
    pub fn new(max_retries: u32, initial_delay: Duration, backoff_factor: f64, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            backoff_factor,
            max_delay,
            jitter: true,
        }
    }

    /// Same policy without jitter.
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// 2 retries, 200ms, x2, 1s cap.
    pub fn quick() -> Self {
        Self::new(2, Duration::from_millis(200), 2.0, Duration::from_secs(1))
    }

    /// 3 retries, 1s, x2, 10s cap.
    pub fn standard() -> Self {
        Self::new(3, Duration::from_secs(1), 2.0, Duration::from_secs(10))
    }

    /// 5 retries, 500ms, x1.5, 5s cap.
    pub fn aggressive() -> Self {
        Self::new(5, Duration::from_millis(500), 1.5, Duration::from_secs(5))
    }

    /// 5 retries, 2s, x2, 30s cap.
    pub fn patient() -> Self {
        Self::new(5, Duration::from_secs(2), 2.0, Duration::from_secs(30))
    }

    /// Un-jittered delay before retry `retry_index` (0-indexed).
    pub fn delay_for_retry(&self, retry_index: u32) -> Duration {
        let factor = self.backoff_factor.max(1.0).powi(retry_index.min(64) as i32);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    fn sleep_for_retry(&self, retry_index: u32) -> Duration {
        let delay = self.delay_for_retry(retry_index);
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let millis = rand::thread_rng().gen_range(0..=delay.as_millis() as u64);
        Duration::from_millis(millis)
    }

    /// Run `attempt` with the default string classifier applied to the
    /// error's `Display` output.
    pub async fn run<F, Fut, T, E>(&self, attempt: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.run_with(attempt, |e: &E, attempt_index| {
            default_should_retry(&e.to_string(), attempt_index)
        })
        .await
    }

    /// Run `attempt`, retrying while `should_retry(error, attempt_index)`
    /// holds and the retry budget is not spent.
    ///
    /// Total invocations never exceed `max_retries + 1`.
    pub async fn run_with<F, Fut, T, E, C>(&self, mut attempt: F, should_retry: C) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        C: Fn(&E, u32) -> bool,
    {
        let mut run = RetryRun::default();

        loop {
            match attempt().await {
                Ok(value) => {
                    if run.attempt_index > 0 {
                        debug!(
                            attempts = run.attempt_index + 1,
                            waited_ms = run.cumulative_delay.as_millis() as u64,
                            "Succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(e) => {
                    if run.attempt_index >= self.max_retries || !should_retry(&e, run.attempt_index) {
                        return Err(e);
                    }
                    let delay = self.sleep_for_retry(run.attempt_index);
                    warn!(
                        attempt = run.attempt_index + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retryable error, will retry"
                    );
                    sleep(delay).await;
                    run.cumulative_delay += delay;
                    run.attempt_index += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Progress of one `run_with` loop.
#[derive(Debug, Default)]
struct RetryRun {
    attempt_index: u32,
    cumulative_delay: Duration,
}

/// Default error classifier.
///
/// Numeric status codes match as whole tokens so `4000ms` is not a 400.
pub fn default_should_retry(message: &str, attempt_index: u32) -> bool {
    if attempt_index + 1 >= DEFAULT_CLASSIFIER_MAX_ATTEMPTS {
        return false;
    }

    let lower = message.to_lowercase();
    let has_code = |codes: &[&str]| {
        lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|token| codes.contains(&token))
    };
    let has_phrase = |phrases: &[&str]| phrases.iter().any(|p| lower.contains(p));

    if has_code(NON_RETRYABLE_CODES) || has_phrase(NON_RETRYABLE_PHRASES) {
        return false;
    }
    has_code(RETRYABLE_CODES) || has_phrase(RETRYABLE_PHRASES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_presets() {
        let quick = RetryPolicy::quick();
        assert_eq!(quick.max_retries, 2);
        assert_eq!(quick.initial_delay, Duration::from_millis(200));
        assert_eq!(quick.max_delay, Duration::from_secs(1));
        assert!(quick.jitter);

        let aggressive = RetryPolicy::aggressive();
        assert_eq!(aggressive.backoff_factor, 1.5);
        assert_eq!(RetryPolicy::patient().max_delay, Duration::from_secs(30));
        assert_eq!(RetryPolicy::default(), RetryPolicy::standard());
    }

    #[test]
    fn test_delay_for_retry() {
        let policy = RetryPolicy::standard();
        assert_eq!(policy.delay_for_retry(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_retry(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_retry(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for_retry(4), Duration::from_secs(10));
        assert_eq!(policy.delay_for_retry(40), Duration::from_secs(10));
    }

    #[test]
    fn test_jittered_delay_within_bounds() {
        let policy = RetryPolicy::standard();
        for _ in 0..50 {
            let d = policy.sleep_for_retry(1);
            assert!(d <= Duration::from_secs(2), "jittered delay {:?} above cap", d);
        }
        let fixed = policy.without_jitter();
        assert_eq!(fixed.sleep_for_retry(1), Duration::from_secs(2));
    }

    #[test]
    fn test_default_classifier() {
        assert!(default_should_retry("network error: connection refused", 0));
        assert!(default_should_retry("server returned 503", 0));
        assert!(default_should_retry("HTTP 429 Too Many Requests", 1));
        assert!(default_should_retry("timed out after 4000ms", 0));

        assert!(!default_should_retry("HTTP 404 Not Found", 0));
        assert!(!default_should_retry("401 Unauthorized", 0));
        assert!(!default_should_retry("invalid requirement: missing payTo", 0));
    }

    #[test]
    fn test_default_classifier_stops_at_third_attempt() {
        assert!(default_should_retry("network error", 1));
        assert!(!default_should_retry("network error", 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_success_first_attempt() {
        let policy = RetryPolicy::quick();
        let attempts = Arc::new(AtomicU32::new(0));

        let result = policy
            .run(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_transient_errors() {
        let policy = RetryPolicy::standard();
        let attempts = Arc::new(AtomicU32::new(0));

        let result = policy
            .run(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst);
                    if count < 2 {
                        Err("network error: connection reset".to_string())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_default_classifier_caps_at_three() {
        let policy = RetryPolicy::patient();
        let attempts = Arc::new(AtomicU32::new(0));

        let result = policy
            .run(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("503 service unavailable".to_string())
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_no_retry_on_client_error() {
        let policy = RetryPolicy::standard();
        let attempts = Arc::new(AtomicU32::new(0));

        let result = policy
            .run(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("400 bad request".to_string())
                }
            })
            .await;

        assert_eq!(result.unwrap_err(), "400 bad request");
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_respects_max_retries() {
        let policy = RetryPolicy::aggressive();
        let attempts = Arc::new(AtomicU32::new(0));

        let result = policy
            .run_with(
                || {
                    let attempts = Arc::clone(&attempts);
                    async move {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>("always".to_string())
                    }
                },
                |_, _| true,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_sleeps_between_attempts() {
        let policy = RetryPolicy::standard().without_jitter();
        let start = tokio::time::Instant::now();

        let _ = policy
            .run_with(|| async { Err::<(), _>("x".to_string()) }, |_, _| true)
            .await;

        // 1s + 2s + 4s
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }
}
