//! Error types for the resilience layer.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for resilience operations.
pub type ResilienceResult<T> = Result<T, ResilienceError>;

/// Errors produced by the resilience primitives themselves.
///
/// Wrapped by every higher-level error type through `From`, so a manager can
/// return these from inside its own `Result`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResilienceError {
    /// Circuit breaker rejected the call without invoking it.
    #[error("circuit {name} is open; retry in {}s", whole_seconds(.retry_after))]
    CircuitOpen {
        /// Breaker name (logical remote)
        name: String,
        /// Time until the breaker admits a trial
        retry_after: Duration,
    },

    /// Local rate limiter has no token for this operation.
    #[error("rate limit exceeded for {operation}; retry in {}s", whole_seconds(.retry_after))]
    RateLimited {
        /// Operation class
        operation: String,
        /// Time until the next token
        retry_after: Duration,
    },

    /// Same operation key completed inside the dedup window.
    #[error("duplicate request {key} rejected; retry in {}ms", .retry_after.as_millis())]
    Duplicate {
        /// Operation key
        key: String,
        /// Remaining window
        retry_after: Duration,
    },

    /// Call exceeded its deadline.
    #[error("timed out after {}ms", .after.as_millis())]
    TimedOut {
        /// The deadline that elapsed
        after: Duration,
    },

    /// Caller cancelled the call.
    #[error("request cancelled")]
    Cancelled,
}

impl ResilienceError {
    /// Create a new CircuitOpen error.
    pub fn circuit_open(name: impl Into<String>, retry_after: Duration) -> Self {
        Self::CircuitOpen {
            name: name.into(),
            retry_after,
        }
    }

    /// Create a new RateLimited error.
    pub fn rate_limited(operation: impl Into<String>, retry_after: Duration) -> Self {
        Self::RateLimited {
            operation: operation.into(),
            retry_after,
        }
    }

    /// Create a new Duplicate error.
    pub fn duplicate(key: impl Into<String>, retry_after: Duration) -> Self {
        Self::Duplicate {
            key: key.into(),
            retry_after,
        }
    }

    /// Admission errors are local refusals and must never be retried.
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            Self::CircuitOpen { .. } | Self::RateLimited { .. } | Self::Duplicate { .. }
        )
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Suggested wait before the caller tries again, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::CircuitOpen { retry_after, .. }
            | Self::RateLimited { retry_after, .. }
            | Self::Duplicate { retry_after, .. } => Some(*retry_after),
            Self::TimedOut { .. } | Self::Cancelled => None,
        }
    }
}

/// Round a duration up to whole seconds.
pub fn whole_seconds(duration: &Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_seconds_rounds_up() {
        assert_eq!(whole_seconds(&Duration::ZERO), 0);
        assert_eq!(whole_seconds(&Duration::from_millis(1)), 1);
        assert_eq!(whole_seconds(&Duration::from_millis(29_001)), 30);
        assert_eq!(whole_seconds(&Duration::from_secs(30)), 30);
    }

    #[test]
    fn test_whole_seconds_saturates() {
        // An empty limiter reports Duration::MAX until refill.
        assert_eq!(whole_seconds(&Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_error_display() {
        let err = ResilienceError::circuit_open("onchain-protocol", Duration::from_millis(12_300));
        assert_eq!(err.to_string(), "circuit onchain-protocol is open; retry in 13s");

        let err = ResilienceError::TimedOut {
            after: Duration::from_secs(15),
        };
        assert_eq!(err.to_string(), "timed out after 15000ms");
    }

    #[test]
    fn test_admission_classification() {
        assert!(ResilienceError::rate_limited("quote", Duration::from_secs(3)).is_admission());
        assert!(ResilienceError::duplicate("k", Duration::from_secs(1)).is_admission());
        assert!(!ResilienceError::Cancelled.is_admission());

        assert!(ResilienceError::TimedOut {
            after: Duration::from_secs(1)
        }
        .is_retryable());
        assert!(!ResilienceError::Cancelled.is_retryable());
    }

    #[test]
    fn test_retry_after() {
        let err = ResilienceError::rate_limited("quote", Duration::from_secs(3));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
        assert_eq!(ResilienceError::Cancelled.retry_after(), None);
    }
}
