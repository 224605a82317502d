//! Process-wide registry of prompt-cache prefixes.
//!
//! Keys are `(model, sha256(system), sha256(static_prefix))`. The registry
//! does not cache responses; it tracks which prefixes have already been
//! written to the provider-side cache so callers can tell first-use
//! (cache write) from reuse, and so the orchestrator can report hit rates.

use std::collections::HashMap;
use std::sync::Mutex;

use sha2::{Digest, Sha256};

/// Bound on tracked prefixes; least-recently-used entries are evicted.
const MAX_TRACKED_PREFIXES: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    model_hash: [u8; 32],
    system_hash: [u8; 32],
    prefix_hash: [u8; 32],
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PromptCacheStats {
    pub tracked_prefixes: usize,
    pub hits: u64,
    pub misses: u64,
}

/// LRU registry of prompt-cache prefixes seen by this process.
#[derive(Debug, Default)]
pub struct PromptCacheRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    // Entry value is a monotonically increasing use counter for LRU order.
    entries: HashMap<CacheKey, u64>,
    clock: u64,
    hits: u64,
    misses: u64,
}

impl PromptCacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a use of `(model, system, static_prefix)`.
    ///
    /// Returns `true` when the prefix was already tracked (the provider
    /// cache is expected warm), `false` on first use.
    pub fn note_use(&self, model: &str, system: &str, static_prefix: &str) -> bool {
        let key = CacheKey {
            model_hash: hash(model),
            system_hash: hash(system),
            prefix_hash: hash(static_prefix),
        };

        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.clock += 1;
        let clock = inner.clock;

        let seen = inner.entries.insert(key, clock).is_some();
        if seen {
            inner.hits += 1;
        } else {
            inner.misses += 1;
            if inner.entries.len() > MAX_TRACKED_PREFIXES {
                if let Some((&oldest, _)) = inner.entries.iter().min_by_key(|(_, &used)| used) {
                    inner.entries.remove(&oldest);
                }
            }
        }
        seen
    }

    pub fn stats(&self) -> PromptCacheStats {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        PromptCacheStats {
            tracked_prefixes: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
        }
    }
}

fn hash(s: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_use_is_miss_second_is_hit() {
        let registry = PromptCacheRegistry::new();
        assert!(!registry.note_use("model-a", "system", "prefix"));
        assert!(registry.note_use("model-a", "system", "prefix"));

        let stats = registry.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.tracked_prefixes, 1);
    }

    #[test]
    fn distinct_models_do_not_share_entries() {
        let registry = PromptCacheRegistry::new();
        registry.note_use("model-a", "system", "prefix");
        assert!(!registry.note_use("model-b", "system", "prefix"));
    }

    #[test]
    fn registry_is_bounded() {
        let registry = PromptCacheRegistry::new();
        for i in 0..(MAX_TRACKED_PREFIXES + 40) {
            registry.note_use("model", &format!("system-{i}"), "prefix");
        }
        assert!(registry.stats().tracked_prefixes <= MAX_TRACKED_PREFIXES);
    }

    #[test]
    fn eviction_removes_least_recently_used() {
        let registry = PromptCacheRegistry::new();
        for i in 0..MAX_TRACKED_PREFIXES {
            registry.note_use("model", &format!("system-{i}"), "prefix");
        }
        // Refresh entry 0, then push one more to trigger eviction.
        registry.note_use("model", "system-0", "prefix");
        registry.note_use("model", "system-new", "prefix");

        assert!(registry.note_use("model", "system-0", "prefix"));
    }
}
