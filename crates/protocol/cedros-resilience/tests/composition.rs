//! Limiter, retry, breaker and deadline composed the way the managers use them.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cedros_resilience::{
    CallContext, CircuitBreaker, CircuitBreakerConfig, CircuitState, RateLimiter, ResilienceError,
    RetryPolicy,
};

#[derive(Debug, Clone, PartialEq)]
enum CallError {
    Unavailable,
    Resilience(ResilienceError),
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallError::Unavailable => write!(f, "503 service unavailable"),
            CallError::Resilience(e) => write!(f, "{}", e),
        }
    }
}

impl From<ResilienceError> for CallError {
    fn from(e: ResilienceError) -> Self {
        CallError::Resilience(e)
    }
}

fn is_transient(e: &CallError) -> bool {
    match e {
        CallError::Unavailable => true,
        CallError::Resilience(r) => r.is_retryable(),
    }
}

struct Stack {
    limiter: RateLimiter,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    ctx: CallContext,
}

impl Stack {
    fn new(failure_threshold: u32) -> Self {
        Self {
            limiter: RateLimiter::new("quote", 20, Duration::from_secs(60)),
            breaker: CircuitBreaker::new(
                "onchain-protocol",
                CircuitBreakerConfig {
                    failure_threshold,
                    timeout: Duration::from_secs(30),
                },
            ),
            retry: RetryPolicy::standard().without_jitter(),
            ctx: CallContext::with_timeout(Duration::from_millis(500)),
        }
    }

    async fn call<F, Fut>(&self, op: F) -> Result<u32, CallError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<u32, CallError>>,
    {
        self.limiter.admit()?;
        self.retry
            .run_with(
                || self.breaker.execute_with(|| self.ctx.run(op()), is_transient),
                |e, _| is_transient(e),
            )
            .await
    }
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_recover_through_retry() {
    let stack = Stack::new(5);
    let attempts = Arc::new(AtomicU32::new(0));

    let result = stack
        .call(|| {
            let attempts = Arc::clone(&attempts);
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(CallError::Unavailable)
                } else {
                    Ok(9)
                }
            }
        })
        .await;

    assert_eq!(result, Ok(9));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(stack.breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_open_circuit_is_not_retried() {
    let stack = Stack::new(2);
    let attempts = Arc::new(AtomicU32::new(0));

    let result = stack
        .call(|| {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(CallError::Unavailable)
            }
        })
        .await;

    // Two real failures open the circuit; the third attempt is rejected
    // locally and the retry loop stops there.
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert!(matches!(
        result,
        Err(CallError::Resilience(ResilienceError::CircuitOpen { .. }))
    ));
    assert_eq!(stack.breaker.stats().rejection_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_are_retried_and_count_as_failures() {
    let stack = Stack::new(10);
    let attempts = Arc::new(AtomicU32::new(0));

    let result = stack
        .call(|| {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(1)
            }
        })
        .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 4);
    assert!(matches!(
        result,
        Err(CallError::Resilience(ResilienceError::TimedOut { .. }))
    ));
    assert_eq!(stack.breaker.stats().consecutive_failures, 4);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_rejects_before_any_attempt() {
    let stack = Stack::new(5);
    for _ in 0..20 {
        stack.limiter.try_consume();
    }

    let attempts = Arc::new(AtomicU32::new(0));
    let result = stack
        .call(|| {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            }
        })
        .await;

    assert!(matches!(
        result,
        Err(CallError::Resilience(ResilienceError::RateLimited { .. }))
    ));
    assert_eq!(attempts.load(Ordering::SeqCst), 0);
}
