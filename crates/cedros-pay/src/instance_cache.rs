//! Reference-counted cache of shared instances.
//!
//! Each fingerprint maps to one `Arc<V>` and a reference count. The first
//! `acquire` builds the value; later ones bump the count. `release` drops
//! the count and evicts the entry at zero. A [`Lease`] releases on drop.
//!
//! Every entry carries a generation id. A lease only releases the entry it
//! was taken from, so a lease outliving [`InstanceCache::clear`] cannot
//! touch the entry built after it.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use cedros_resilience::sync::lock;

struct CacheEntry<V> {
    value: Arc<V>,
    ref_count: usize,
    generation: u64,
}

/// Fingerprint-keyed instance cache.
pub struct InstanceCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    next_generation: AtomicU64,
}

impl<V> Default for InstanceCache<V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }
}

impl<V> fmt::Debug for InstanceCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceCache")
            .field("entries", &self.len())
            .finish()
    }
}

impl<V> InstanceCache<V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the instance for `fingerprint`, building it with `factory` if absent.
    pub fn acquire(&self, fingerprint: &str, factory: impl FnOnce() -> V) -> Arc<V> {
        match self.try_acquire(fingerprint, || Ok::<_, Infallible>(factory())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Like [`acquire`](Self::acquire) for a fallible factory.
    ///
    /// A failed build leaves the cache unchanged.
    pub fn try_acquire<E>(
        &self,
        fingerprint: &str,
        factory: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        self.acquire_entry(fingerprint, factory)
            .map(|(value, _)| value)
    }

    fn acquire_entry<E>(
        &self,
        fingerprint: &str,
        factory: impl FnOnce() -> Result<V, E>,
    ) -> Result<(Arc<V>, u64), E> {
        let mut entries = lock(&self.entries);

        if let Some(entry) = entries.get_mut(fingerprint) {
            entry.ref_count += 1;
            debug!(
                fingerprint = %fingerprint,
                ref_count = entry.ref_count,
                "Reusing cached instance"
            );
            return Ok((Arc::clone(&entry.value), entry.generation));
        }

        let value = Arc::new(factory()?);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        entries.insert(
            fingerprint.to_string(),
            CacheEntry {
                value: Arc::clone(&value),
                ref_count: 1,
                generation,
            },
        );
        debug!(fingerprint = %fingerprint, generation, "Created cached instance");
        Ok((value, generation))
    }

    /// Drop one reference to `fingerprint`, evicting it at zero.
    pub fn release(&self, fingerprint: &str) {
        self.release_entry(fingerprint, None);
    }

    /// Release only if the entry is still the one `generation` was taken from.
    fn release_entry(&self, fingerprint: &str, generation: Option<u64>) {
        let mut entries = lock(&self.entries);

        let remaining = match entries.get_mut(fingerprint) {
            Some(entry) if generation.is_some_and(|g| g != entry.generation) => {
                warn!(
                    fingerprint = %fingerprint,
                    "Release of a cleared instance ignored"
                );
                return;
            }
            Some(entry) => {
                entry.ref_count = entry.ref_count.saturating_sub(1);
                entry.ref_count
            }
            None => {
                warn!(fingerprint = %fingerprint, "Release of unknown instance ignored");
                return;
            }
        };

        if remaining == 0 {
            entries.remove(fingerprint);
            debug!(fingerprint = %fingerprint, "Evicted cached instance");
        } else {
            debug!(fingerprint = %fingerprint, ref_count = remaining, "Released cached instance");
        }
    }

    /// Current reference count, 0 if absent.
    pub fn ref_count(&self, fingerprint: &str) -> usize {
        lock(&self.entries)
            .get(fingerprint)
            .map(|e| e.ref_count)
            .unwrap_or(0)
    }

    /// Number of cached instances.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry regardless of reference counts.
    ///
    /// Outstanding leases keep their values alive; their later release is
    /// ignored, even if the fingerprint has been acquired again since.
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    /// Acquire `fingerprint` and wrap it in a [`Lease`].
    pub fn lease<E>(
        self: &Arc<Self>,
        fingerprint: &str,
        factory: impl FnOnce() -> Result<V, E>,
    ) -> Result<Lease<V>, E> {
        let (value, generation) = self.acquire_entry(fingerprint, factory)?;
        Ok(Lease {
            cache: Arc::clone(self),
            fingerprint: fingerprint.to_string(),
            generation,
            value,
        })
    }
}

/// One counted reference to a cached instance.
pub struct Lease<V> {
    cache: Arc<InstanceCache<V>>,
    fingerprint: String,
    generation: u64,
    value: Arc<V>,
}

impl<V> Lease<V> {
    /// Fingerprint this lease holds.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Shared handle to the instance.
    pub fn value(&self) -> &Arc<V> {
        &self.value
    }
}

impl<V> Deref for Lease<V> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.value
    }
}

impl<V> Drop for Lease<V> {
    fn drop(&mut self) {
        self.cache
            .release_entry(&self.fingerprint, Some(self.generation));
    }
}

impl<V> fmt::Debug for Lease<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_acquire_builds_once() {
        let cache = InstanceCache::new();
        let builds = AtomicUsize::new(0);
        let build = || {
            builds.fetch_add(1, Ordering::SeqCst);
            "managers".to_string()
        };

        let a = cache.acquire("fp1", build);
        let b = cache.acquire("fp1", || unreachable!("cached"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(cache.ref_count("fp1"), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_release_evicts_at_zero() {
        let cache = InstanceCache::new();
        cache.acquire("fp1", || 1u32);
        cache.acquire("fp1", || 2u32);

        cache.release("fp1");
        assert_eq!(cache.ref_count("fp1"), 1);
        cache.release("fp1");
        assert_eq!(cache.ref_count("fp1"), 0);
        assert!(cache.is_empty());

        // A fresh acquire rebuilds.
        assert_eq!(*cache.acquire("fp1", || 3u32), 3);
    }

    #[test]
    fn test_release_unknown_is_noop() {
        let cache = InstanceCache::new();
        cache.acquire("fp1", || ());
        cache.release("missing");
        assert_eq!(cache.ref_count("fp1"), 1);
    }

    #[test]
    fn test_failed_build_leaves_cache_unchanged() {
        let cache: InstanceCache<u32> = InstanceCache::new();
        let err = cache.try_acquire("fp1", || Err("bad config")).unwrap_err();
        assert_eq!(err, "bad config");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_distinct_fingerprints() {
        let cache = InstanceCache::new();
        let a = cache.acquire("fp1", || 1u32);
        let b = cache.acquire("fp2", || 2u32);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_lease_releases_on_drop() {
        let cache = Arc::new(InstanceCache::new());
        let first = cache.lease("fp1", || Ok::<_, ()>(7u32)).unwrap();
        let second = cache.lease("fp1", || Ok::<_, ()>(8u32)).unwrap();
        assert_eq!(*first, 7);
        assert_eq!(*second, 7);
        assert_eq!(cache.ref_count("fp1"), 2);

        drop(first);
        assert_eq!(cache.ref_count("fp1"), 1);
        drop(second);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_with_outstanding_lease() {
        let cache = Arc::new(InstanceCache::new());
        let lease = cache.lease("fp1", || Ok::<_, ()>(1u32)).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(*lease, 1);
        drop(lease);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stale_lease_does_not_release_rebuilt_entry() {
        let cache = Arc::new(InstanceCache::new());
        let stale = cache.lease("fp1", || Ok::<_, ()>(1u32)).unwrap();
        cache.clear();

        let fresh = cache.lease("fp1", || Ok::<_, ()>(2u32)).unwrap();
        assert_eq!(cache.ref_count("fp1"), 1);

        drop(stale);
        assert_eq!(cache.ref_count("fp1"), 1);

        let third = cache.lease("fp1", || Ok::<_, ()>(3u32)).unwrap();
        assert!(Arc::ptr_eq(fresh.value(), third.value()));
        assert_eq!(*third, 2);
        assert_eq!(cache.ref_count("fp1"), 2);

        drop(fresh);
        drop(third);
        assert!(cache.is_empty());
    }
}
