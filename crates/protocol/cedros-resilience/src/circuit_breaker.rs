//! Circuit breaker for one logical remote.
//!
//! ```text
//!            failures >= threshold
//!   Closed ───────────────────────────▶ Open
//!     ▲                                  │ now >= open_until (lazy)
//!     │ trial ok                         ▼
//!     └──────────────────────────── HalfOpen ──trial fails──▶ Open
//! ```
//!
//! The `Open -> HalfOpen` transition is applied lazily whenever the breaker
//! is read or used. While half-open, exactly one trial is admitted.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use cedros_types::constants::{DEFAULT_CIRCUIT_TIMEOUT_MS, DEFAULT_FAILURE_THRESHOLD};

use crate::error::ResilienceError;
use crate::sync::lock;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls flow through
    Closed,
    /// Calls are rejected until `open_until`
    Open,
    /// One trial call is allowed through
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Breaker tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before admitting a trial
    #[serde(with = "crate::duration_ms")]
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            timeout: Duration::from_millis(DEFAULT_CIRCUIT_TIMEOUT_MS),
        }
    }
}

/// Point-in-time snapshot of a breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitStats {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub success_count: u64,
    pub failure_count: u64,
    pub rejection_count: u64,
    pub last_failure_at: Option<Instant>,
    pub last_success_at: Option<Instant>,
    pub open_until: Option<Instant>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    success_count: u64,
    failure_count: u64,
    rejection_count: u64,
    last_failure_at: Option<Instant>,
    last_success_at: Option<Instant>,
    open_until: Option<Instant>,
    trial_in_flight: bool,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            success_count: 0,
            failure_count: 0,
            rejection_count: 0,
            last_failure_at: None,
            last_success_at: None,
            open_until: None,
            trial_in_flight: false,
        }
    }

    fn open(&mut self, now: Instant, timeout: Duration) {
        self.state = CircuitState::Open;
        self.open_until = Some(now + timeout);
        self.trial_in_flight = false;
    }
}

/// Circuit breaker guarding one logical remote.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

/// Admission ticket for one call. Clears the trial flag if the call is
/// dropped before it settles.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.settled {
            lock(&self.breaker.inner).trial_in_flight = false;
        }
    }
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner::new()),
        }
    }

    /// Breaker name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Breaker tuning.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn refresh(&self, inner: &mut BreakerInner, now: Instant) {
        if inner.state != CircuitState::Open {
            return;
        }
        if let Some(until) = inner.open_until {
            if now >= until {
                inner.state = CircuitState::HalfOpen;
                inner.open_until = None;
                inner.trial_in_flight = false;
                info!(circuit = %self.name, "Circuit half-open, admitting trial");
            }
        }
    }

    /// Current state, after applying the lazy open-to-half-open check.
    pub fn state(&self) -> CircuitState {
        let mut inner = lock(&self.inner);
        self.refresh(&mut inner, Instant::now());
        inner.state
    }

    /// Snapshot of counters and timestamps.
    pub fn stats(&self) -> CircuitStats {
        let mut inner = lock(&self.inner);
        self.refresh(&mut inner, Instant::now());
        CircuitStats {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            success_count: inner.success_count,
            failure_count: inner.failure_count,
            rejection_count: inner.rejection_count,
            last_failure_at: inner.last_failure_at,
            last_success_at: inner.last_success_at,
            open_until: inner.open_until,
        }
    }

    fn admit(&self) -> Result<Permit<'_>, ResilienceError> {
        let now = Instant::now();
        let mut inner = lock(&self.inner);
        self.refresh(&mut inner, now);

        match inner.state {
            CircuitState::Closed => Ok(Permit {
                breaker: self,
                trial: false,
                settled: false,
            }),
            CircuitState::Open => {
                inner.rejection_count += 1;
                let retry_after = inner
                    .open_until
                    .map(|until| until.saturating_duration_since(now))
                    .unwrap_or(self.config.timeout);
                debug!(circuit = %self.name, "Circuit open, rejecting call");
                Err(ResilienceError::circuit_open(&self.name, retry_after))
            }
            CircuitState::HalfOpen if inner.trial_in_flight => {
                inner.rejection_count += 1;
                debug!(circuit = %self.name, "Trial in flight, rejecting call");
                Err(ResilienceError::circuit_open(
                    &self.name,
                    Duration::from_secs(1),
                ))
            }
            CircuitState::HalfOpen => {
                inner.trial_in_flight = true;
                Ok(Permit {
                    breaker: self,
                    trial: true,
                    settled: false,
                })
            }
        }
    }

    fn on_success(&self, permit: &mut Permit<'_>) {
        permit.settled = true;
        let now = Instant::now();
        let mut inner = lock(&self.inner);
        inner.success_count += 1;
        inner.last_success_at = Some(now);
        inner.consecutive_failures = 0;
        if permit.trial {
            inner.trial_in_flight = false;
        }
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Closed;
            inner.open_until = None;
            info!(circuit = %self.name, "Circuit closed after successful trial");
        }
    }

    fn on_failure(&self, permit: &mut Permit<'_>) {
        permit.settled = true;
        let now = Instant::now();
        let mut inner = lock(&self.inner);
        inner.failure_count += 1;
        inner.last_failure_at = Some(now);
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        match inner.state {
            CircuitState::HalfOpen => {
                inner.open(now, self.config.timeout);
                warn!(
                    circuit = %self.name,
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "Trial failed, circuit re-opened"
                );
            }
            CircuitState::Closed
                if inner.consecutive_failures >= self.config.failure_threshold =>
            {
                inner.open(now, self.config.timeout);
                warn!(
                    circuit = %self.name,
                    failures = inner.consecutive_failures,
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "Circuit opened"
                );
            }
            _ => {}
        }
    }

    /// Run `operation` through the breaker, counting every error as a
    /// failure.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ResilienceError>,
    {
        self.execute_with(operation, |_| true).await
    }

    /// Run `operation` through the breaker; only errors for which
    /// `is_failure` returns true count against the circuit; the others
    /// count as a healthy response from the remote.
    pub async fn execute_with<F, Fut, T, E, C>(&self, operation: F, is_failure: C) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ResilienceError>,
        C: FnOnce(&E) -> bool,
    {
        let mut permit = self.admit().map_err(E::from)?;
        let result = operation().await;
        match &result {
            Ok(_) => self.on_success(&mut permit),
            Err(e) if is_failure(e) => self.on_failure(&mut permit),
            Err(_) => self.on_success(&mut permit),
        }
        result
    }

    /// Force the circuit closed and clear the failure counter.
    pub fn reset(&self) {
        let mut inner = lock(&self.inner);
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.open_until = None;
        inner.trial_in_flight = false;
        info!(circuit = %self.name, "Circuit manually reset");
    }

    /// Force the circuit open for one timeout period.
    pub fn trip(&self) {
        let mut inner = lock(&self.inner);
        inner.open(Instant::now(), self.config.timeout);
        warn!(circuit = %self.name, "Circuit manually tripped");
    }
}
