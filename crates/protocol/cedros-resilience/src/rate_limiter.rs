//! Token bucket rate limiter with lazy refill.
//!
//! Tokens are stored as `f64` so partial refills accumulate between calls.
//! Refill only happens when the bucket is touched; there is no background
//! task.

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::error::{ResilienceError, ResilienceResult};
use crate::sync::lock;

/// Named capacity/window pairs used by the managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitPreset {
    /// 5 per minute: session and hold creation
    Strict,
    /// 20 per minute: quote fetch and proof submission
    Standard,
    /// 30 per minute: gasless build and cart quote
    Relaxed,
    /// 60 per minute: generic UI actions
    Permissive,
}

impl RateLimitPreset {
    /// Bucket capacity.
    pub fn capacity(&self) -> u32 {
        match self {
            Self::Strict => 5,
            Self::Standard => 20,
            Self::Relaxed => 30,
            Self::Permissive => 60,
        }
    }

    /// Window over which `capacity` tokens refill.
    pub fn window(&self) -> Duration {
        Duration::from_secs(60)
    }

    /// Build a limiter for `operation` using this preset.
    pub fn limiter(&self, operation: impl Into<String>) -> RateLimiter {
        RateLimiter::new(operation, self.capacity(), self.window())
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill_at: Instant,
}

/// Token bucket for one operation class.
#[derive(Debug)]
pub struct RateLimiter {
    operation: String,
    capacity: u32,
    window: Duration,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a full bucket.
    pub fn new(operation: impl Into<String>, capacity: u32, window: Duration) -> Self {
        Self {
            operation: operation.into(),
            capacity,
            window,
            bucket: Mutex::new(Bucket {
                tokens: capacity as f64,
                last_refill_at: Instant::now(),
            }),
        }
    }

    /// Operation class this limiter guards.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Maximum number of tokens.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Tokens added per millisecond.
    fn refill_per_ms(&self) -> f64 {
        let window_ms = self.window.as_secs_f64() * 1000.0;
        if window_ms <= 0.0 {
            f64::INFINITY
        } else {
            self.capacity as f64 / window_ms
        }
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(bucket.last_refill_at).as_secs_f64() * 1000.0;
        let added = elapsed_ms * self.refill_per_ms();
        bucket.tokens = (bucket.tokens + added).min(self.capacity as f64);
        bucket.last_refill_at = now;
    }

    /// Take one token if available.
    pub fn try_consume(&self) -> bool {
        let mut bucket = lock(&self.bucket);
        self.refill(&mut bucket);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Take one token or fail with [`ResilienceError::RateLimited`].
    pub fn admit(&self) -> ResilienceResult<()> {
        if self.try_consume() {
            return Ok(());
        }
        let retry_after = self.time_until_refill();
        debug!(
            operation = %self.operation,
            retry_after_ms = retry_after.as_millis() as u64,
            "Rate limit exceeded"
        );
        Err(ResilienceError::rate_limited(&self.operation, retry_after))
    }

    /// Whole tokens currently available.
    pub fn available_tokens(&self) -> u32 {
        let mut bucket = lock(&self.bucket);
        self.refill(&mut bucket);
        bucket.tokens.floor() as u32
    }

    /// Time until at least one token is available; zero if one already is.
    pub fn time_until_refill(&self) -> Duration {
        let mut bucket = lock(&self.bucket);
        self.refill(&mut bucket);
        if bucket.tokens >= 1.0 {
            return Duration::ZERO;
        }
        let rate = self.refill_per_ms();
        if rate <= 0.0 {
            // Zero-capacity bucket never refills.
            return Duration::MAX;
        }
        let missing_ms = (1.0 - bucket.tokens) / rate;
        Duration::from_secs_f64(missing_ms / 1000.0)
    }

    /// Refill the bucket to capacity.
    pub fn reset(&self) {
        let mut bucket = lock(&self.bucket);
        bucket.tokens = self.capacity as f64;
        bucket.last_refill_at = Instant::now();
    }
}
