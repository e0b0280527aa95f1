//! Request deduplication and the decoded-audio cache
//!
//! A key lives in at most one of two maps: `pending` while its single fetch
//! is in flight, `resolved` once that fetch produced audio. Both maps sit
//! behind one mutex so the move from one to the other is atomic.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde::Serialize;

use crate::types::{AudioBuffer, CacheKey};

/// Shared handle to an in-flight fetch; every clone resolves to the same value
pub type SharedFetch = Shared<BoxFuture<'static, Option<Arc<AudioBuffer>>>>;

/// Outcome of [`SpeechCache::lookup_or_start`]
pub enum Lookup {
    /// Audio is already cached
    Ready(Arc<AudioBuffer>),
    /// Another caller's fetch is in flight
    Joined(SharedFetch),
    /// This caller registered a new fetch
    Started(SharedFetch),
}

impl std::fmt::Debug for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(buffer) => f.debug_tuple("Ready").field(buffer).finish(),
            Self::Joined(_) => f.write_str("Joined"),
            Self::Started(_) => f.write_str("Started"),
        }
    }
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Resolved entries
    pub entries: usize,
    /// Fetches in flight
    pub pending: usize,
    /// Lookups served without starting a fetch
    pub hits: u64,
    /// Lookups that started a fetch
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate in `[0, 1]`, zero before the first lookup
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct PendingFetch {
    id: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
struct CacheState {
    resolved: HashMap<CacheKey, Arc<AudioBuffer>>,
    pending: HashMap<CacheKey, PendingFetch>,
    next_id: u64,
}

/// Deduplicating store of decoded speech
#[derive(Default)]
pub struct SpeechCache {
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for SpeechCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechCache")
            .field("stats", &self.stats())
            .finish()
    }
}

impl SpeechCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached buffer, join the in-flight fetch, or start one
    ///
    /// `start` is called at most once, under the lock, with the id the
    /// fetch must later pass to [`Self::complete`]. It must not block and
    /// must not touch this cache synchronously.
    pub fn lookup_or_start<F>(&self, key: &CacheKey, start: F) -> Lookup
    where
        F: FnOnce(u64) -> BoxFuture<'static, Option<Arc<AudioBuffer>>>,
    {
        let mut state = self.state.lock();

        if let Some(buffer) = state.resolved.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Lookup::Ready(Arc::clone(buffer));
        }

        if let Some(pending) = state.pending.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Lookup::Joined(pending.fetch.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let id = state.next_id;
        state.next_id += 1;

        let fetch = start(id).shared();
        state.pending.insert(
            key.clone(),
            PendingFetch {
                id,
                fetch: fetch.clone(),
            },
        );
        Lookup::Started(fetch)
    }

    /// Settle fetch `id` for `key`
    ///
    /// Removes the pending entry and, when `buffer` is present, stores it in
    /// the same critical section. Returns `false` (and changes nothing) when
    /// the entry was cleared or replaced since the fetch started.
    pub fn complete(&self, key: &CacheKey, id: u64, buffer: Option<Arc<AudioBuffer>>) -> bool {
        let mut state = self.state.lock();

        if !state.pending.get(key).is_some_and(|pending| pending.id == id) {
            return false;
        }

        state.pending.remove(key);
        if let Some(buffer) = buffer {
            state.resolved.insert(key.clone(), buffer);
        }
        true
    }

    /// Cached buffer for `key`, without counting a lookup
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Arc<AudioBuffer>> {
        self.state.lock().resolved.get(key).cloned()
    }

    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().resolved.contains_key(key)
    }

    #[must_use]
    pub fn is_pending(&self, key: &CacheKey) -> bool {
        self.state.lock().pending.contains_key(key)
    }

    /// Drop every resolved and pending entry
    ///
    /// In-flight fetches keep running for the callers already awaiting
    /// them, but their results are discarded.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.resolved.clear();
        state.pending.clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entries: state.resolved.len(),
            pending: state.pending.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
