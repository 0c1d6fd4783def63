//! Click cooldown for UI payment controls.
//!
//! A [`GuardedHandler`] ignores invocations inside `cooldown` of the last
//! accepted one, then runs the handler through a [`RequestDeduplicator`]
//! keyed by the control id.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use cedros_types::constants::{DEFAULT_CLICK_COOLDOWN_MS, DEFAULT_DEDUP_WINDOW_MS};

use crate::dedupe::RequestDeduplicator;
use crate::error::ResilienceError;
use crate::sync::lock;

/// Cooldown and dedup window for one control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickGuardOptions {
    /// Minimum spacing between accepted clicks
    #[serde(with = "crate::duration_ms")]
    pub cooldown: Duration,
    /// Post-completion window for the wrapped handler
    #[serde(with = "crate::duration_ms")]
    pub dedup_window: Duration,
}

impl Default for ClickGuardOptions {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(DEFAULT_CLICK_COOLDOWN_MS),
            dedup_window: Duration::from_millis(DEFAULT_DEDUP_WINDOW_MS),
        }
    }
}

impl ClickGuardOptions {
    /// Options for on-chain payment buttons: every accepted click re-quotes.
    pub fn payment_button() -> Self {
        Self {
            dedup_window: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CooldownEntry {
    cooldown_until: Instant,
}

type CooldownMap = Arc<Mutex<HashMap<String, CooldownEntry>>>;

/// Registry of per-control cooldowns.
#[derive(Debug, Clone, Default)]
pub struct ClickGuard {
    cooldowns: CooldownMap,
}

impl ClickGuard {
    /// Create an empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `handler` for the control `control_id`.
    pub fn wrap<F, Fut, T, E>(
        &self,
        control_id: impl Into<String>,
        options: ClickGuardOptions,
        handler: F,
    ) -> GuardedHandler<F, T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + From<ResilienceError> + 'static,
    {
        GuardedHandler {
            control_id: control_id.into(),
            cooldown: options.cooldown,
            cooldowns: Arc::clone(&self.cooldowns),
            dedupe: RequestDeduplicator::new(options.dedup_window),
            handler,
        }
    }

    /// Remaining cooldown for `control_id`, zero if none.
    pub fn remaining_cooldown(&self, control_id: &str) -> Duration {
        lock(&self.cooldowns)
            .get(control_id)
            .map(|e| e.cooldown_until.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    /// Number of controls with a recorded cooldown.
    pub fn len(&self) -> usize {
        lock(&self.cooldowns).len()
    }

    /// Returns true if no cooldowns are recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cooldown.
    pub fn clear(&self) {
        lock(&self.cooldowns).clear();
    }
}

/// Handler wrapped with cooldown and deduplication.
pub struct GuardedHandler<F, T, E> {
    control_id: String,
    cooldown: Duration,
    cooldowns: CooldownMap,
    dedupe: RequestDeduplicator<T, E>,
    handler: F,
}

impl<F, Fut, T, E> GuardedHandler<F, T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<ResilienceError> + 'static,
{
    /// Control id this handler is keyed by.
    pub fn control_id(&self) -> &str {
        &self.control_id
    }

    /// Invoke the handler.
    ///
    /// Returns `None` when the click lands inside the cooldown.
    pub async fn invoke(&self) -> Option<Result<T, E>> {
        {
            let mut cooldowns = lock(&self.cooldowns);
            let now = Instant::now();
            if let Some(entry) = cooldowns.get(&self.control_id) {
                if now < entry.cooldown_until {
                    debug!(control = %self.control_id, "Click ignored during cooldown");
                    return None;
                }
            }
            cooldowns.retain(|_, entry| now < entry.cooldown_until);
            cooldowns.insert(
                self.control_id.clone(),
                CooldownEntry {
                    cooldown_until: now + self.cooldown,
                },
            );
        }

        Some(self.dedupe.dedupe(&self.control_id, || (self.handler)()).await)
    }
}
