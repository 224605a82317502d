//! In-memory TTL cache for API responses.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

/// Per-operation TTLs.
pub const CHANNEL_TTL: Duration = Duration::from_secs(3600);
pub const VIDEO_TTL: Duration = Duration::from_secs(900);
pub const SEARCH_TTL: Duration = Duration::from_secs(900);

/// Cap on cached entries; expired and oldest entries are dropped on insert.
const MAX_ENTRIES: usize = 4096;

#[derive(Debug)]
struct Entry {
    expires_at: Instant,
    value: serde_json::Value,
}

/// TTL cache keyed by `op:argument` strings, storing JSON snapshots of
/// the typed results.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a cached value if present and fresh.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                serde_json::from_value(entry.value.clone()).ok()
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a value under `key` for `ttl`.
    pub async fn put<T: Serialize>(&self, key: impl Into<String>, value: &T, ttl: Duration) {
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };
        let mut entries = self.entries.lock().await;
        if entries.len() >= MAX_ENTRIES {
            let now = Instant::now();
            entries.retain(|_, e| e.expires_at > now);
            if entries.len() >= MAX_ENTRIES {
                if let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.expires_at)
                    .map(|(k, _)| k.clone())
                {
                    entries.remove(&oldest);
                }
            }
        }
        entries.insert(
            key.into(),
            Entry {
                expires_at: Instant::now() + ttl,
                value,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_values() {
        let cache = ResponseCache::new();
        cache.put("search:q", &vec!["a", "b"], SEARCH_TTL).await;
        let got: Option<Vec<String>> = cache.get("search:q").await;
        assert_eq!(got, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[tokio::test]
    async fn expired_entries_miss() {
        let cache = ResponseCache::new();
        cache.put("k", &1u32, Duration::from_millis(0)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let got: Option<u32> = cache.get("k").await;
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn unknown_key_misses() {
        let cache = ResponseCache::new();
        let got: Option<u32> = cache.get("missing").await;
        assert_eq!(got, None);
    }
}
