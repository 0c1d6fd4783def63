//! Resilience primitives shared by every Cedros Pay manager.
//!
//! Each outbound call made by a payment manager is composed, outermost
//! first, as:
//!
//! ```text
//! RateLimiter::admit  ->  RetryPolicy::run_with  ->  CircuitBreaker::execute
//!                     ->  CallContext::run (timeout / cancel)  ->  HTTP
//! ```
//!
//! Admission errors ([`ResilienceError::RateLimited`],
//! [`ResilienceError::CircuitOpen`], [`ResilienceError::Duplicate`]) are
//! surfaced immediately and never retried.
//!
//! # Module Organization
//!
//! - [`rate_limiter`] - Token bucket with lazy refill and presets
//! - [`circuit_breaker`] - Closed / Open / HalfOpen failure isolation
//! - [`retry`] - Exponential backoff with full jitter
//! - [`dedupe`] - In-flight coalescing with a post-completion window
//! - [`click_guard`] - UI click cooldown on top of the deduplicator
//! - [`timeout`] - Deadline and cancellation for a single call
//! - [`error`] - [`ResilienceError`]

pub mod circuit_breaker;
pub mod click_guard;
pub mod dedupe;
pub mod duration_ms;
pub mod error;
pub mod rate_limiter;
pub mod retry;
pub mod sync;
pub mod timeout;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState, CircuitStats};
pub use click_guard::{ClickGuard, ClickGuardOptions, GuardedHandler};
pub use dedupe::RequestDeduplicator;
pub use error::{ResilienceError, ResilienceResult};
pub use rate_limiter::{RateLimitPreset, RateLimiter};
pub use retry::{default_should_retry, RetryPolicy};
pub use timeout::CallContext;

// Re-exported so callers do not need a direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;
