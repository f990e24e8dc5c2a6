//! Time-expiring cache for serialized verification responses.
//!
//! Entries are keyed by caller-supplied request id and carry an absolute
//! expiry deadline. Expiry is enforced lazily on read: an expired entry is
//! logically absent the moment its deadline passes, whether or not it has
//! been physically removed. Memory is reclaimed by a periodic sweep task.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// A cached response with its expiry deadline.
struct CacheEntry {
    response: Bytes,
    expires_at: Instant,
}

/// Concurrency-safe key/value store with per-entry TTL.
///
/// Cloning is cheap; all clones share the same underlying map. Any number
/// of readers proceed together; `set` and `cleanup` take the write lock.
#[derive(Clone, Default)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl ResponseCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, expiring `ttl` from now.
    ///
    /// Overwrites any existing entry for the key, refreshing its deadline.
    pub fn set(&self, key: &str, value: Bytes, ttl: Duration) {
        let entry = CacheEntry {
            response: value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(key.to_string(), entry);
    }

    /// Look up `key`, returning the value only while it is unexpired.
    ///
    /// An expired entry yields `None` immediately; its physical removal is
    /// left to the next sweep so the read path never waits on a deletion.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if Instant::now() >= entry.expires_at {
            trace!(key, "cache entry expired");
            return None;
        }
        Some(entry.response.clone())
    }

    /// Remove every entry whose deadline has passed, returning the count.
    ///
    /// Safe to call concurrently with `get`/`set`; has no observable effect
    /// beyond memory reclamation.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of entries currently held, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Spawn the periodic sweep task.
    ///
    /// Runs `cleanup()` every `interval` until `shutdown` flips to `true`,
    /// so the task never holds the process open past an orderly shutdown.
    pub fn spawn_sweeper(
        &self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.cleanup();
                        if removed > 0 {
                            debug!(removed, remaining = cache.len(), "cache sweep");
                        }
                    }
                    changed = shutdown.changed() => {
                        // A dropped sender can never signal shutdown later;
                        // exit rather than spin on the closed channel.
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("cache sweeper stopping");
                            break;
                        }
                    }
                }
            }
        })
    }
}
