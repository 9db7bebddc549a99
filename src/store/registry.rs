//! Mosaic registry: parsed-document cache in front of a document store.
//!
//! The registry provides:
//! - LRU caching of parsed documents, keyed by `(location, gzip flag)`
//! - Singleflight loads, so concurrent requests for the same key trigger a
//!   single store read
//! - Gzip detection from the `.gz` suffix unless a flag is given
//!
//! # Example
//!
//! ```ignore
//! use mosaic_streamer::store::{MosaicRegistry, StoreRouter};
//!
//! let registry = MosaicRegistry::new(StoreRouter::new());
//!
//! // Reads and parses on first access, then serves from the cache
//! let mosaic = registry.get("https://example.com/mosaic.json.gz", None).await?;
//! ```

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use tokio::sync::{Notify, RwLock};
use tracing::debug;

use super::DocumentStore;
use crate::error::MosaicError;
use crate::mosaic::{should_decompress, MosaicJson};

// =============================================================================
// Configuration
// =============================================================================

/// Default number of cached mosaic documents.
pub const DEFAULT_MOSAIC_CACHE_CAPACITY: usize = 512;

/// `(location, explicit gzip flag)`
type CacheKey = (String, Option<bool>);

/// Every gzip flag a location can be cached under.
const GZIP_VARIANTS: [Option<bool>; 3] = [None, Some(true), Some(false)];

type LoadResult = Result<Arc<MosaicJson>, MosaicError>;

// =============================================================================
// MosaicRegistry
// =============================================================================

/// Cache of parsed mosaic documents backed by a [`DocumentStore`].
///
/// A load whose caller goes away (dropped future, timeout) releases its key:
/// waiters wake up and one of them reads again. A load overlapping an
/// [`invalidate`](MosaicRegistry::invalidate) of its location still answers
/// its own callers but is never cached.
pub struct MosaicRegistry<S: DocumentStore> {
    /// Where the bytes come from
    store: S,

    /// Parsed documents
    cache: RwLock<LruCache<CacheKey, Arc<MosaicJson>>>,

    /// In-flight loads for singleflight pattern; never held across an await
    in_flight: Mutex<HashMap<CacheKey, Arc<InFlightState>>>,
}

/// State for an in-flight load.
struct InFlightState {
    /// Notification for waiters
    notify: Notify,

    outcome: Mutex<Outcome>,

    /// Set when the location was invalidated during the load
    stale: AtomicBool,
}

#[derive(Clone)]
enum Outcome {
    Pending,
    Loaded(LoadResult),
    /// The loading future was dropped before finishing
    Abandoned,
}

impl InFlightState {
    fn new() -> Self {
        Self {
            notify: Notify::new(),
            outcome: Mutex::new(Outcome::Pending),
            stale: AtomicBool::new(false),
        }
    }

    fn outcome(&self) -> Outcome {
        lock(&self.outcome).clone()
    }
}

/// Releases the in-flight slot of a load, however the load ends.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashMap<CacheKey, Arc<InFlightState>>>,
    key: &'a CacheKey,
    state: &'a Arc<InFlightState>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        {
            let mut outcome = lock(&self.state.outcome);
            if matches!(*outcome, Outcome::Pending) {
                *outcome = Outcome::Abandoned;
            }
        }
        {
            let mut in_flight = lock(self.in_flight);
            // invalidate() may already have handed the key to a newer load
            if in_flight
                .get(self.key)
                .is_some_and(|current| Arc::ptr_eq(current, self.state))
            {
                in_flight.remove(self.key);
            }
        }
        self.state.notify.notify_waiters();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: DocumentStore> MosaicRegistry<S> {
    /// Create a registry caching up to 512 documents.
    pub fn new(store: S) -> Self {
        Self::with_capacity(store, DEFAULT_MOSAIC_CACHE_CAPACITY)
    }

    /// Create a registry caching up to `capacity` documents (at least one).
    pub fn with_capacity(store: S, capacity: usize) -> Self {
        Self {
            store,
            cache: RwLock::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a document, loading it if not already cached.
    ///
    /// # Arguments
    /// * `location` - Where the document lives
    /// * `gzip` - Force decompression on or off; `None` uses the `.gz` suffix
    pub async fn get(&self, location: &str, gzip: Option<bool>) -> LoadResult {
        let key: CacheKey = (location.to_string(), gzip);

        // Fast path: check cache
        {
            let mut cache = self.cache.write().await;
            if let Some(doc) = cache.get(&key) {
                debug!(location, "Mosaic cache hit");
                return Ok(doc.clone());
            }
        }

        // Slow path: wait on an in-flight load or become the loader
        loop {
            let (state, is_leader) = {
                let mut in_flight = lock(&self.in_flight);
                if let Some(state) = in_flight.get(&key).cloned() {
                    (state, false)
                } else {
                    let state = Arc::new(InFlightState::new());
                    in_flight.insert(key.clone(), state.clone());
                    (state, true)
                }
            };

            if is_leader {
                return self.lead(&key, &state).await;
            }

            // Register before checking, so a notify between the two is not lost
            let notified = state.notify.notified();
            match state.outcome() {
                Outcome::Loaded(result) => return result,
                Outcome::Abandoned => continue,
                Outcome::Pending => {}
            }
            notified.await;

            if let Outcome::Loaded(result) = state.outcome() {
                return result;
            }
            debug!(location, "Mosaic load abandoned, retrying");
        }
    }

    /// Run the load for `key` as the singleflight leader.
    async fn lead(&self, key: &CacheKey, state: &Arc<InFlightState>) -> LoadResult {
        let _guard = InFlightGuard {
            in_flight: &self.in_flight,
            key,
            state,
        };

        let (location, gzip) = key;
        let result = self.load(location, *gzip).await.map(Arc::new);

        if let Ok(ref doc) = result {
            let mut cache = self.cache.write().await;
            // invalidate() flags stale loads while holding this same lock
            if state.stale.load(Ordering::SeqCst) {
                debug!(location = %location, "Mosaic invalidated during load, not caching");
            } else {
                cache.put(key.clone(), doc.clone());
            }
        }

        *lock(&state.outcome) = Outcome::Loaded(result.clone());
        result
    }

    /// Read and parse a document, bypassing the cache.
    async fn load(&self, location: &str, gzip: Option<bool>) -> Result<MosaicJson, MosaicError> {
        let body = self.store.read(location).await?;
        let decompress = should_decompress(location, gzip);
        debug!(
            location,
            store = self.store.name(),
            bytes = body.len(),
            decompress,
            "Fetched mosaic"
        );
        MosaicJson::from_bytes(&body, decompress, location)
    }

    /// Drop every cached variant of `location`.
    ///
    /// Loads of `location` already running are detached: their result is
    /// not cached and later callers start a fresh read.
    pub async fn invalidate(&self, location: &str) {
        let mut cache = self.cache.write().await;
        let mut in_flight = lock(&self.in_flight);
        for gzip in GZIP_VARIANTS {
            let key = (location.to_string(), gzip);
            cache.pop(&key);
            if let Some(state) = in_flight.remove(&key) {
                state.stale.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Clear all cached documents and detach running loads.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        let mut in_flight = lock(&self.in_flight);
        cache.clear();
        for (_, state) in in_flight.drain() {
            state.stale.store(true, Ordering::SeqCst);
        }
    }

    /// Number of cached documents.
    pub async fn cached_count(&self) -> usize {
        let cache = self.cache.read().await;
        cache.len()
    }
}

// =============================================================================
// Tests
// =============================================================================
