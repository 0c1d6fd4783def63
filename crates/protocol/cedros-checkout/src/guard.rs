//! Remote-call composition shared by the card and credits managers.

use std::future::Future;

use serde::{Deserialize, Serialize};

use cedros_resilience::{CircuitBreaker, CircuitBreakerConfig, RateLimiter, RetryPolicy};

use crate::error::{CheckoutError, CheckoutResult};

/// Retry and breaker settings for one rail.
///
/// Fields missing from a serialized form take the card-rail defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RailConfig {
    pub retry: RetryPolicy,
    pub breaker: CircuitBreakerConfig,
}

impl Default for RailConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::quick(),
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// Admit once on `limiter`, then retry transient failures through `breaker`.
pub(crate) async fn guarded<T, F, Fut>(
    limiter: &RateLimiter,
    retry: &RetryPolicy,
    breaker: &CircuitBreaker,
    op: F,
) -> CheckoutResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = CheckoutResult<T>>,
{
    limiter.admit()?;
    let op = &op;
    retry
        .run_with(
            move || breaker.execute_with(move || op(), |e: &CheckoutError| e.is_retryable()),
            |e: &CheckoutError, _| e.is_retryable(),
        )
        .await
}
