//! Cache Store Module
//!
//! The cache engine: a single-lock map from derived keys to call results,
//! with lazy TTL expiry and a global byte budget.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{request_key, CacheEntry, CacheStats};
use crate::config::CacheConfig;
use crate::control::CacheControl;
use crate::error::Result;
use crate::rpc::{CallContext, Metadata};

/// Maps a call's context to a string appended to its cache key, keeping
/// results of different tenants or sessions apart.
pub type KeyPartFn = Arc<dyn Fn(&CallContext) -> String + Send + Sync>;

// == Cache State ==
/// Everything guarded by the cache lock.
#[derive(Debug, Default)]
struct CacheState {
    /// Derived key -> cached result
    results: HashMap<String, CacheEntry>,
    /// Sum of payload sizes over `results`, maintained incrementally
    size: u64,
    stats: CacheStats,
}

impl CacheState {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.results.remove(key)?;
        self.size -= entry.size();
        Some(entry)
    }
}

// == Cache ==
/// Client-side cache of unary call results.
///
/// All operations take one mutex for their whole duration. None of them
/// block on I/O, and none may be called re-entrantly (for example from a
/// `KeyPart` function).
pub struct Cache {
    state: Mutex<CacheState>,
    /// Byte budget for stored payloads, 0 = unbounded
    max_size: u64,
    key_part: Option<KeyPartFn>,
    /// Emit hit/miss/store/expire diagnostics
    log: bool,
}

impl Cache {
    // == Constructor ==
    /// Creates an unbounded cache with diagnostics off and no partitioning.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_size: 0,
            key_part: None,
            log: false,
        }
    }

    /// Creates a cache from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new()
            .with_max_size(config.max_size)
            .with_log(config.log)
    }

    /// Sets the byte budget. 0 means unbounded.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the function whose output is appended to every key.
    pub fn with_key_part<F>(mut self, key_part: F) -> Self
    where
        F: Fn(&CallContext) -> String + Send + Sync + 'static,
    {
        self.key_part = Some(Arc::new(key_part));
        self
    }

    pub fn with_log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Every mutation leaves the state consistent before anything that
        // can panic runs, so a poisoned lock still guards valid data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cache_key<Req: Serialize + ?Sized>(
        &self,
        ctx: &CallContext,
        method: &str,
        request: &Req,
    ) -> Result<String> {
        let partition = self.key_part.as_ref().map(|key_part| key_part(ctx));
        request_key(method, request, partition.as_deref())
    }

    // == Get ==
    /// Looks up a cached result for `method` called with `request`.
    ///
    /// Returns `Ok(Some(result))` on a live hit and `Ok(None)` when nothing
    /// usable is cached. An entry found past its expiry is removed and
    /// reported as a miss. Errors come only from serializing the request or
    /// deserializing the cached payload, and leave the cache unchanged.
    pub fn get<Req, Resp>(
        &self,
        ctx: &CallContext,
        method: &str,
        request: &Req,
    ) -> Result<Option<Resp>>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let mut guard = self.lock();
        let state = &mut *guard;

        let key = self.cache_key(ctx, method, request)?;

        let Some(entry) = state.results.get(&key) else {
            state.stats.record_miss();
            if self.log {
                info!("cache MISS    {} [{}]", method, key);
            }
            return Ok(None);
        };

        if entry.is_expired(Instant::now()) {
            state.remove(&key);
            state.stats.record_expiration();
            if self.log {
                info!("cache EXPIRED {} [{}] (size {})", method, key, state.size);
            }
            return Ok(None);
        }

        let result = serde_json::from_slice(&entry.payload)?;
        state.stats.record_hit();
        if self.log {
            info!("cache HIT     {} [{}]", method, key);
        }
        Ok(Some(result))
    }

    // == Store ==
    /// Records the result of a completed call, honoring the cache-control
    /// directive found in its response trailer.
    ///
    /// A malformed directive is a protocol error. A missing or non-cacheable
    /// directive stores nothing.
    pub fn store<Req, Resp>(
        &self,
        ctx: &CallContext,
        method: &str,
        request: &Req,
        result: &Resp,
        trailer: &Metadata,
    ) -> Result<()>
    where
        Req: Serialize + ?Sized,
        Resp: Serialize + ?Sized,
    {
        let control = CacheControl::decode(trailer)?;
        self.store_control(ctx, method, request, result, control)
    }

    /// Records a result under an already decoded directive.
    ///
    /// If the result would push the total size past the budget it is not
    /// stored, and any entry already under its key is dropped as well.
    /// Rejection is not an error.
    pub fn store_control<Req, Resp>(
        &self,
        ctx: &CallContext,
        method: &str,
        request: &Req,
        result: &Resp,
        control: Option<CacheControl>,
    ) -> Result<()>
    where
        Req: Serialize + ?Sized,
        Resp: Serialize + ?Sized,
    {
        let mut guard = self.lock();
        let state = &mut *guard;

        let control = match control {
            Some(control) if control.is_cacheable() => control,
            _ => {
                debug!("not caching {}: no cacheable directive", method);
                return Ok(());
            }
        };

        let key = self.cache_key(ctx, method, request)?;
        let payload = serde_json::to_vec(result)?;

        let previous = state.results.get(&key).map(CacheEntry::size).unwrap_or(0);
        let new_size = state.size - previous + payload.len() as u64;

        if self.max_size != 0 && new_size > self.max_size {
            // Whatever sits under this key is older than the result we just
            // refused; drop it rather than keep serving it.
            state.remove(&key);
            state.stats.record_rejection();
            if self.log {
                info!(
                    "cache REJECT  {} [{}]: {} bytes over budget of {} (size {})",
                    method,
                    key,
                    new_size - self.max_size,
                    self.max_size,
                    state.size
                );
            }
            return Ok(());
        }

        state
            .results
            .insert(key.clone(), CacheEntry::new(payload, control, Instant::now()));
        state.size = new_size;
        state.stats.record_store();
        if self.log {
            info!(
                "cache STORE   {} [{}] for {:?} (size {})",
                method,
                key,
                control.max_age(),
                state.size
            );
        }
        Ok(())
    }

    // == Clear ==
    /// Removes every entry. Counters other than occupancy are kept.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.results.clear();
        state.size = 0;
        if self.log {
            info!("cache CLEAR");
        }
    }

    // == Stats ==
    /// Returns a snapshot of counters and occupancy.
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let mut stats = state.stats.clone();
        stats.entries = state.results.len();
        stats.size_bytes = state.size;
        stats.max_size = self.max_size;
        stats
    }

    /// Total payload bytes currently stored.
    pub fn size(&self) -> u64 {
        self.lock().size
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.lock().results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().results.is_empty()
    }

    /// Recomputes the payload total by scanning, for checking the
    /// incrementally maintained size.
    #[cfg(test)]
    pub(crate) fn scanned_size(&self) -> u64 {
        self.lock().results.values().map(CacheEntry::size).sum()
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("max_size", &self.max_size)
            .field("key_part", &self.key_part.is_some())
            .field("log", &self.log)
            .finish_non_exhaustive()
    }
}
