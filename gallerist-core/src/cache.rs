use std::{
    collections::{HashMap, VecDeque},
    fmt,
    sync::Arc,
};

use parking_lot::Mutex;
use tracing::debug;

use crate::crawler::{CrawlQuery, DirectoryCrawler};

pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Canonical signature of a [`CrawlQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl From<&CrawlQuery> for CacheKey {
    fn from(query: &CrawlQuery) -> Self {
        CacheKey(query.cache_key())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    crawlers: HashMap<CacheKey, Arc<DirectoryCrawler>>,
    /// Insertion order; the front is evicted first.
    order: VecDeque<CacheKey>,
}

/// Capacity-bounded map from query signature to crawler.
///
/// Eviction is FIFO by insertion: a hit does not refresh a key's position.
/// An evicted crawler keeps running for callers still holding it.
#[derive(Debug)]
pub struct CatalogCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl CatalogCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Existing crawler for `key`, or the one built by `create`. The flag is
    /// `true` when a new crawler was inserted.
    pub fn get_or_insert_with<F>(&self, key: CacheKey, create: F) -> (Arc<DirectoryCrawler>, bool)
    where
        F: FnOnce() -> DirectoryCrawler,
    {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.crawlers.get(&key) {
            return (Arc::clone(existing), false);
        }

        while inner.order.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.crawlers.remove(&oldest);
            debug!(key = %oldest, "evicted catalog crawler");
        }

        let crawler = Arc::new(create());
        inner.order.push_back(key.clone());
        inner.crawlers.insert(key, Arc::clone(&crawler));
        (crawler, true)
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<DirectoryCrawler>> {
        self.inner.lock().crawlers.get(key).cloned()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.lock().crawlers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().crawlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.crawlers.clear();
        inner.order.clear();
    }
}
