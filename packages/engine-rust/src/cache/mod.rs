//! Bounded in-process cache for derived aggregates.
//!
//! Owned by the composer and constructed at engine startup; there is no
//! module-level mutable state. Entries carry a jittered TTL so a burst of
//! writes does not expire in lockstep, and `clear()` gives tests and
//! shutdown a clean reset.

pub mod keys;

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;

const TTL_JITTER_RATIO: f64 = 0.1;

struct Entry {
    payload: String,
    expires_at: Instant,
}

pub struct EngineCache {
    entries: Mutex<LruCache<String, Entry>>,
}

impl EngineCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            entries.pop(key);
            return None;
        }
        serde_json::from_str(&entry.payload).ok()
    }

    pub fn set<T>(&self, key: &str, value: &T, ttl: Duration)
    where
        T: Serialize,
    {
        let payload = match serde_json::to_string(value) {
            Ok(p) => p,
            Err(_) => return,
        };
        let expires_at = Instant::now() + apply_ttl_jitter(ttl);
        self.entries.lock().put(
            key.to_string(),
            Entry {
                payload,
                expires_at,
            },
        );
    }

    pub fn delete(&self, key: &str) {
        self.entries.lock().pop(key);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

fn apply_ttl_jitter(ttl: Duration) -> Duration {
    let base_ms = ttl.as_millis() as f64;
    let mut rng = rand::rng();
    let factor = rng.random_range(1.0 - TTL_JITTER_RATIO..=1.0 + TTL_JITTER_RATIO);
    let jittered_ms = (base_ms * factor).round().max(1.0);
    Duration::from_millis(jittered_ms as u64)
}
