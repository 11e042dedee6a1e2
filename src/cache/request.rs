//! Single-flight cache of report downloads
//!
//! Each key maps to one shared download future. Concurrent callers for the
//! same key await the same future, so at most one request per key is ever in
//! flight. Successful downloads stay fresh for the configured TTL; the map is
//! kept in least-recently-used order and trimmed back to capacity, skipping
//! downloads that are still running.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use indexmap::IndexMap;
use log::debug;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::cache::CacheKey;
use crate::client::{FetchResult, Fetcher, RawResponse};
use crate::config::CacheConfig;
use crate::error::FetchError;

/// A download shared by every caller of the same key
pub type SharedFetch = Shared<BoxFuture<'static, FetchResult<Arc<RawResponse>>>>;

struct CacheEntry {
    created: Instant,
    response: SharedFetch,
    abort: AbortHandle,
}

impl CacheEntry {
    fn is_resolved(&self) -> bool {
        self.response.peek().is_some()
    }
}

/// Time- and capacity-bounded download cache in front of a [`Fetcher`].
///
/// Must be used from within a tokio runtime: a miss spawns the download.
pub struct RequestCache<F> {
    fetcher: Arc<F>,
    entries: Mutex<IndexMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl<F: Fetcher + 'static> RequestCache<F> {
    pub fn new(fetcher: Arc<F>, config: &CacheConfig) -> Self {
        Self {
            fetcher,
            entries: Mutex::new(IndexMap::new()),
            ttl: config.ttl(),
            capacity: config.capacity.max(1),
        }
    }

    /// Shared download for `key`, starting one if none is cached.
    ///
    /// Lookup and registration happen under one lock, so two racing misses
    /// on the same key still produce a single download. Failed downloads are
    /// not evicted here; callers drop them with [`RequestCache::invalidate`].
    pub fn get_or_fetch(&self, key: &CacheKey) -> SharedFetch {
        let mut entries = self.lock();

        if let Some(idx) = entries.get_index_of(key) {
            let fresh = entries
                .get_index(idx)
                .is_some_and(|(_, entry)| !self.is_expired(entry));
            if fresh {
                let last = entries.len() - 1;
                entries.move_index(idx, last);
                if let Some((_, entry)) = entries.get_index(last) {
                    debug!("Cache hit: {key}");
                    return entry.response.clone();
                }
            } else {
                debug!("Cache expired: {key}");
                entries.shift_remove_index(idx);
            }
        }

        debug!("Cache miss: {key}");
        let entry = self.spawn_fetch(key);
        let response = entry.response.clone();
        entries.insert(key.clone(), entry);
        self.evict_if_full(&mut entries);
        response
    }

    /// Drop the entry for `key`, but only if it still holds `fetch`.
    ///
    /// `fetch` must be a handle that was not itself awaited (await a clone),
    /// since a finished `Shared` handle no longer compares equal. A caller
    /// evicting a failed download late thereby never removes a newer
    /// download another caller started in the meantime.
    pub fn invalidate(&self, key: &CacheKey, fetch: &SharedFetch) -> bool {
        let mut entries = self.lock();
        let current = entries
            .get(key)
            .is_some_and(|entry| entry.response.ptr_eq(fetch));
        if current {
            entries.shift_remove(key);
            debug!("Cache evicted: {key}");
        } else {
            debug!("Cache eviction skipped, {key} was already replaced");
        }
        current
    }

    /// Drop every entry, cancelling downloads still in flight
    pub fn clear(&self) {
        let mut entries = self.lock();
        for entry in entries.values() {
            entry.abort.abort();
        }
        entries.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Running downloads never expire, so a key cannot get a second one
    fn is_expired(&self, entry: &CacheEntry) -> bool {
        entry.is_resolved() && entry.created.elapsed() >= self.ttl
    }

    fn spawn_fetch(&self, key: &CacheKey) -> CacheEntry {
        let fetcher = Arc::clone(&self.fetcher);
        let url = key.as_str().to_string();
        let handle = tokio::spawn(async move { fetcher.fetch(&url).await.map(Arc::new) });
        let abort = handle.abort_handle();

        let response = async move {
            match handle.await {
                Ok(result) => result,
                Err(err) if err.is_cancelled() => Err(FetchError::Cancelled),
                Err(err) => Err(FetchError::Network(format!("Fetch task failed: {err}"))),
            }
        }
        .boxed()
        .shared();

        CacheEntry {
            created: Instant::now(),
            response,
            abort,
        }
    }

    /// Drop expired entries, then least recently used finished ones
    fn evict_if_full(&self, entries: &mut IndexMap<CacheKey, CacheEntry>) {
        if entries.len() <= self.capacity {
            return;
        }

        entries.retain(|_, entry| !self.is_expired(entry));
        while entries.len() > self.capacity {
            let Some(idx) = entries.values().position(CacheEntry::is_resolved) else {
                break;
            };
            if let Some((key, _)) = entries.shift_remove_index(idx) {
                debug!("Cache evicted (capacity): {key}");
            }
        }
    }
}
