use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Cache, CacheError};

/// Default bound on the number of entries held by a [`MemoryCache`].
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, (String, Instant)>,
    /// Earliest expiry among stored entries, if any.
    next_expiry: Option<Instant>,
}

impl Entries {
    fn sweep(&mut self, now: Instant) {
        self.map.retain(|_, (_, expires)| *expires > now);
        self.next_expiry = self.map.values().map(|(_, expires)| *expires).min();
    }

    fn evict_soonest(&mut self) {
        let soonest = self
            .map
            .iter()
            .min_by_key(|(_, (_, expires))| *expires)
            .map(|(key, _)| key.clone());
        if let Some(key) = soonest {
            self.map.remove(&key);
        }
    }
}

/// Process-local cache with per-entry expiry and a bound on its size.
///
/// Expired entries are swept on write once the earliest expiry has passed.
/// When the cache is full of live entries the one closest to expiry is evicted.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<Entries>,
    max_entries: usize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl MemoryCache {
    /// Creates an empty cache holding at most [`DEFAULT_MAX_ENTRIES`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cache holding at most `max_entries`.
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            max_entries: max_entries.max(1),
        }
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Cache for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock();
        match entries.map.get(key) {
            Some((value, expires)) if *expires > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.map.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires = now + ttl;
        let mut entries = self.entries.lock();

        if entries.next_expiry.is_some_and(|next| next <= now) {
            entries.sweep(now);
        }
        if !entries.map.contains_key(key) && entries.map.len() >= self.max_entries {
            entries.evict_soonest();
        }

        entries.map.insert(key.to_string(), (value, expires));
        entries.next_expiry = Some(entries.next_expiry.map_or(expires, |next| next.min(expires)));
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().map.remove(key);
        Ok(())
    }
}
