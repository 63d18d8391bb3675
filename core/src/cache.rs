//! Pluggable response cache keyed by request URL.
//!
//! # Design
//! The cache stores whole `Response` values with a per-entry expiry. The
//! backing store is swappable per connection: `InMemoryCache` is the
//! default, `NoOpCache` disables caching entirely. Callers racing on the
//! same key get last-writer-wins semantics; no cross-thread transactional
//! guarantee is offered or needed.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::http::Response;

/// Key-value store mapping a request URL to a previously obtained response.
pub trait Cache: Send + Sync {
    /// Fetch the response cached under `key`, or `None` on a miss. An entry
    /// past its expiry behaves as a miss.
    fn get(&self, key: &str) -> Option<Response>;

    /// Store `value` under `key` for at most `max_age`, overwriting any
    /// existing entry.
    fn set(&self, key: &str, value: Response, max_age: Duration);

    /// Remove the entry for `key`. No-op if absent.
    fn clear(&self, key: &str);
}

struct Entry {
    value: Response,
    expires_at: Instant,
}

/// In-memory cache with per-entry expiry. The default for new connections.
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache for InMemoryCache {
    fn get(&self, key: &str) -> Option<Response> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                // Expired; evict so the map does not grow without bound.
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: Response, max_age: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + max_age,
        };
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), entry);
    }

    fn clear(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}

/// A cache that never hits. Argue this at connect time to disable caching.
pub struct NoOpCache;

impl Cache for NoOpCache {
    fn get(&self, _key: &str) -> Option<Response> {
        None
    }

    fn set(&self, _key: &str, _value: Response, _max_age: Duration) {}

    fn clear(&self, _key: &str) {}
}
