//! In-flight request coalescing with a post-completion window.
//!
//! Concurrent callers under one key share a single pending future. After it
//! settles the key stays `Completed` for `window`, during which new calls
//! are rejected as duplicates. A zero window removes the key on settle.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::debug;

use cedros_types::constants::DEFAULT_DEDUP_WINDOW_MS;

use crate::error::ResilienceError;
use crate::sync::lock;

type SharedResult<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

enum DedupeEntry<T, E> {
    InFlight {
        handle: SharedResult<T, E>,
        generation: u64,
    },
    Completed {
        at: Instant,
    },
}

type EntryMap<T, E> = Arc<Mutex<HashMap<String, DedupeEntry<T, E>>>>;

/// Coalesces concurrent calls that share an operation key.
pub struct RequestDeduplicator<T, E> {
    window: Duration,
    entries: EntryMap<T, E>,
    next_generation: AtomicU64,
}

impl<T, E> std::fmt::Debug for RequestDeduplicator<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDeduplicator")
            .field("window", &self.window)
            .field("entries", &lock(&self.entries).len())
            .finish()
    }
}

impl<T, E> Default for RequestDeduplicator<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<ResilienceError> + 'static,
{
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEDUP_WINDOW_MS))
    }
}

impl<T, E> RequestDeduplicator<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<ResilienceError> + 'static,
{
    /// Create a deduplicator with the given post-completion window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Post-completion window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Run `factory` under `key`, or join the call already in flight.
    pub async fn dedupe<F, Fut>(&self, key: &str, factory: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let handle = {
            let mut entries = lock(&self.entries);
            let now = Instant::now();

            let existing = match entries.get(key) {
                Some(DedupeEntry::InFlight { handle, .. }) => Some(handle.clone()),
                Some(DedupeEntry::Completed { at }) => {
                    let elapsed = now.saturating_duration_since(*at);
                    if elapsed < self.window {
                        let retry_after = self.window - elapsed;
                        debug!(
                            key,
                            retry_after_ms = retry_after.as_millis() as u64,
                            "Duplicate request rejected"
                        );
                        return Err(E::from(ResilienceError::duplicate(key, retry_after)));
                    }
                    None
                }
                None => None,
            };

            match existing {
                Some(handle) => {
                    debug!(key, "Joining in-flight request");
                    handle
                }
                None => {
                    prune_expired(&mut entries, self.window, now);
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    let handle = self.register(key, generation, factory());
                    entries.insert(
                        key.to_string(),
                        DedupeEntry::InFlight {
                            handle: handle.clone(),
                            generation,
                        },
                    );
                    handle
                }
            }
        };

        handle.await
    }

    fn register<Fut>(&self, key: &str, generation: u64, fut: Fut) -> SharedResult<T, E>
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let entries = Arc::clone(&self.entries);
        let window = self.window;
        let key = key.to_string();

        async move {
            let result = fut.await;
            let mut entries = lock(&entries);
            let current = matches!(
                entries.get(&key),
                Some(DedupeEntry::InFlight { generation: g, .. }) if *g == generation
            );
            // A forget/clear during flight means this result no longer owns the key.
            if current {
                if window.is_zero() {
                    entries.remove(&key);
                } else {
                    let now = Instant::now();
                    prune_expired(&mut entries, window, now);
                    entries.insert(key, DedupeEntry::Completed { at: now });
                }
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Drop any registration for `key`.
    pub fn forget(&self, key: &str) {
        lock(&self.entries).remove(key);
    }

    /// Drop every registration.
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    /// Whether `key` has a call in flight.
    pub fn is_in_flight(&self, key: &str) -> bool {
        matches!(
            lock(&self.entries).get(key),
            Some(DedupeEntry::InFlight { .. })
        )
    }

    /// Number of tracked keys (in flight or inside their window).
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Returns true if no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drop `Completed` entries whose window has elapsed.
fn prune_expired<T, E>(
    entries: &mut HashMap<String, DedupeEntry<T, E>>,
    window: Duration,
    now: Instant,
) {
    entries.retain(|_, entry| match entry {
        DedupeEntry::InFlight { .. } => true,
        DedupeEntry::Completed { at } => now.saturating_duration_since(*at) < window,
    });
}
