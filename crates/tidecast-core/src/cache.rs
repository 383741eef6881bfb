//! In-memory response cache keyed by stable request keys.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How a single call interacts with the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Serve a live entry if present, otherwise fetch and store.
    #[default]
    Use,
    /// Always fetch, then store the fresh response.
    Refresh,
    /// Always fetch; never read or write the cache.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        matches!(self, Self::Use | Self::Refresh)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<String, CacheEntry>,
    ttl: Duration,
}

/// Shared TTL cache of raw response bodies.
///
/// A zero TTL disables the store: puts are ignored and gets always miss.
#[derive(Debug, Clone)]
pub struct CacheStore {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
}

impl CacheStore {
    /// Creates an empty store whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner {
                map: HashMap::new(),
                ttl,
            })),
        }
    }

    /// Creates a store that never holds anything.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns the cached body for `key`.
    ///
    /// Returns `None` if:
    /// - No entry exists for the key
    /// - The entry has expired
    /// - The store is disabled
    pub async fn get(&self, key: &str) -> Option<String> {
        let store = self.inner.read().await;
        store
            .map
            .get(key)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.body.clone())
    }

    /// Stores `body` under `key` for the configured TTL, replacing any
    /// previous entry. No-op when the store is disabled.
    pub async fn put(&self, key: String, body: String) {
        let mut store = self.inner.write().await;
        if store.ttl.is_zero() {
            return;
        }
        let expires_at = Instant::now() + store.ttl;
        store.map.insert(key, CacheEntry { body, expires_at });
    }

    /// Drops expired entries and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut store = self.inner.write().await;
        let before = store.map.len();
        let now = Instant::now();
        store.map.retain(|_, entry| entry.expires_at > now);
        before - store.map.len()
    }

    /// Removes every entry, live or expired.
    pub async fn clear(&self) {
        self.inner.write().await.map.clear();
    }

    /// Entry count, expired entries included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// `true` when the TTL is zero.
    pub async fn is_disabled(&self) -> bool {
        self.inner.read().await.ttl.is_zero()
    }
}
