use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

struct CachedFragment {
    text: String,
    expires_at: Instant,
}

/// Normalized fragment text keyed by filename, kept for a fixed TTL.
///
/// Clones share the same entries, so a loader and a test can hold the same cache.
#[derive(Clone)]
pub struct FragmentCache {
    entries: Arc<RwLock<HashMap<String, CachedFragment>>>,
    ttl: Duration,
}

impl FragmentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get the cached text for `filename` if it hasn't expired. An expired entry is evicted.
    pub fn get(&self, filename: &str) -> Option<String> {
        let mut entries = self.entries.write().ok()?;

        let expired = match entries.get(filename) {
            Some(entry) if Instant::now() < entry.expires_at => {
                tracing::debug!(filename, hit = true, "fragment_cache.get");
                return Some(entry.text.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(filename);
        }

        tracing::debug!(filename, hit = false, "fragment_cache.get");
        None
    }

    /// Remove every expired entry.
    pub fn cleanup_expired(&self) {
        if let Ok(mut entries) = self.entries.write() {
            let before = entries.len();
            let now = Instant::now();
            entries.retain(|_, entry| now < entry.expires_at);
            tracing::debug!(
                removed = before.saturating_sub(entries.len()),
                remaining = entries.len(),
                "fragment_cache.cleanup_expired"
            );
        }
    }

    pub fn set(&self, filename: &str, text: String) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                filename.to_string(),
                CachedFragment {
                    text,
                    expires_at: Instant::now() + self.ttl,
                },
            );
        } else {
            tracing::warn!(filename, "fragment_cache.set failed (lock poisoned)");
        }
    }

    /// Drop every entry, expired or not.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            let removed = entries.len();
            entries.clear();
            tracing::debug!(removed, "fragment_cache.clear");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
