//! Bundle cache.
//!
//! Merged bundles are cached per (application, profile, label) together with
//! the backend version they were built from. A lookup is a hit only when the
//! stored version equals the freshly probed one, so a change in the backing
//! store is picked up by the next request.
//!
//! Concurrent misses for the same key and version share one computation: the
//! first caller spawns it and registers a shared handle in the in-flight
//! table, latecomers await that handle. The computation runs as its own task,
//! so it completes and populates the cache even when every waiter goes away.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::bundle::ResolvedBundle;
use crate::document::BackendVersion;
use crate::errors::{ConfigError, ConfigResult};
use crate::request::CacheKey;

type SharedCompute = Shared<BoxFuture<'static, ConfigResult<Arc<ResolvedBundle>>>>;

type FlightKey = (CacheKey, BackendVersion);

/// One cached bundle.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub bundle: Arc<ResolvedBundle>,
    pub version: BackendVersion,
    pub created_at: DateTime<Utc>,
}

/// Version-validated cache of resolved bundles.
///
/// Cloning is cheap and clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct BundleCache {
    inner: Arc<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    in_flight: Mutex<HashMap<FlightKey, SharedCompute>>,
    max_entries: Option<usize>,
}

impl std::fmt::Debug for CacheInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheInner")
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

impl BundleCache {
    /// Creates an unbounded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache holding at most `max_entries` bundles; the oldest
    /// entry is evicted first.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                max_entries: Some(max_entries.max(1)),
                ..CacheInner::default()
            }),
        }
    }

    /// Returns the cached bundle for `key` if it is still current, otherwise
    /// computes, stores and returns a fresh one.
    ///
    /// `probe` reports the current backend version. `compute` is invoked at
    /// most once per concurrent miss of the same key and version; every
    /// waiter receives the same bundle or the same error. Errors are never
    /// cached.
    ///
    /// # Errors
    ///
    /// Propagates errors from `probe` and from the computation.
    pub async fn get_or_compute<P, F, Fut>(
        &self,
        key: CacheKey,
        probe: P,
        compute: F,
    ) -> ConfigResult<Arc<ResolvedBundle>>
    where
        P: Future<Output = ConfigResult<BackendVersion>>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ConfigResult<ResolvedBundle>> + Send + 'static,
    {
        let version = probe.await?;

        if let Some(bundle) = self.inner.lookup(&key, &version).await {
            debug!(key = %key, version = %version, "Cache hit");
            return Ok(bundle);
        }

        let shared = {
            let mut in_flight = self.inner.in_flight.lock().await;

            // A computation may have completed between the lookup and the lock.
            if let Some(bundle) = self.inner.lookup(&key, &version).await {
                debug!(key = %key, version = %version, "Cache hit");
                return Ok(bundle);
            }

            let flight_key = (key, version);
            match in_flight.get(&flight_key) {
                Some(existing) => {
                    debug!(key = %flight_key.0, version = %flight_key.1, "Joining in-flight computation");
                    existing.clone()
                }
                None => {
                    debug!(key = %flight_key.0, version = %flight_key.1, "Cache miss");
                    let shared = self.spawn_compute(flight_key.clone(), compute());
                    in_flight.insert(flight_key, shared.clone());
                    shared
                }
            }
        };

        shared.await
    }

    fn spawn_compute<Fut>(&self, flight_key: FlightKey, future: Fut) -> SharedCompute
    where
        Fut: Future<Output = ConfigResult<ResolvedBundle>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let task_key = flight_key.clone();
        let handle = tokio::spawn(async move {
            let started_at = Utc::now();
            let result = future.await.map(Arc::new);
            if let Ok(bundle) = &result {
                inner
                    .store(task_key.0.clone(), Arc::clone(bundle), started_at)
                    .await;
            }
            inner.in_flight.lock().await.remove(&task_key);
            result
        });

        let inner = Arc::clone(&self.inner);
        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(key = %flight_key.0, error = %e, "Bundle computation task failed");
                    inner.in_flight.lock().await.remove(&flight_key);
                    Err(ConfigError::Internal {
                        reason: format!("bundle computation failed: {}", e),
                    })
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Current entry for `key`, regardless of version.
    pub async fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner.entries.read().await.get(key).cloned()
    }

    /// Removes the entry for `key`.
    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        self.inner.entries.write().await.remove(key).is_some()
    }

    /// Removes every entry.
    pub async fn clear(&self) {
        self.inner.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.entries.read().await.is_empty()
    }
}

impl CacheInner {
    async fn lookup(&self, key: &CacheKey, version: &BackendVersion) -> Option<Arc<ResolvedBundle>> {
        self.entries
            .read()
            .await
            .get(key)
            .filter(|entry| &entry.version == version)
            .map(|entry| Arc::clone(&entry.bundle))
    }

    /// Stores `bundle` unless an entry for another version was stored after
    /// its computation started.
    async fn store(&self, key: CacheKey, bundle: Arc<ResolvedBundle>, started_at: DateTime<Utc>) {
        let mut entries = self.entries.write().await;

        if let Some(existing) = entries.get(&key) {
            if existing.version != bundle.version && existing.created_at > started_at {
                debug!(
                    key = %key,
                    stored = %existing.version,
                    computed = %bundle.version,
                    "Keeping newer cache entry"
                );
                return;
            }
        }

        if let Some(max) = self.max_entries {
            if !entries.contains_key(&key) && entries.len() >= max {
                let oldest = entries
                    .values()
                    .min_by_key(|entry| entry.created_at)
                    .map(|entry| entry.key.clone());
                if let Some(oldest) = oldest {
                    debug!(key = %oldest, "Evicting oldest cache entry");
                    entries.remove(&oldest);
                }
            }
        }

        let entry = CacheEntry {
            key: key.clone(),
            version: bundle.version.clone(),
            bundle,
            created_at: Utc::now(),
        };
        entries.insert(key, entry);
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
