// src/cache.rs
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Time-bounded lookup cache for external version queries. Entries past the
/// TTL are treated as absent; there is no eviction beyond that, which is fine
/// for the short-lived, low-volume usage these services see.
pub struct TtlCache<V> {
    entries: DashMap<String, (V, Instant)>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.entries.get(key)?;
        let (value, stored_at) = entry.value();
        if stored_at.elapsed() < self.ttl {
            Some(value.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), (value, Instant::now()));
    }
}
