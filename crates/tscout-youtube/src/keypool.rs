//! Rotating API key pool.

use std::sync::atomic::{AtomicUsize, Ordering};

/// A pool of Data API keys, rotated when one runs out of quota.
#[derive(Debug)]
pub struct KeyPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl KeyPool {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Parse a comma-separated key list (the `SEARCH_API_KEYS` format).
    pub fn from_csv(csv: &str) -> Self {
        let keys = csv
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect();
        Self::new(keys)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The key the pool currently points at.
    pub fn current(&self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let idx = self.cursor.load(Ordering::Relaxed) % self.keys.len();
        Some(&self.keys[idx])
    }

    /// Advance to the next key after a quota error.
    pub fn rotate(&self) {
        self.cursor.fetch_add(1, Ordering::Relaxed);
    }

    /// Iterate every key once, starting at the current cursor position.
    /// The caller rotates on quota errors, so retried operations resume
    /// on the freshest key.
    pub fn iter_from_current(&self) -> impl Iterator<Item = &str> {
        let start = if self.keys.is_empty() {
            0
        } else {
            self.cursor.load(Ordering::Relaxed) % self.keys.len()
        };
        (0..self.keys.len()).map(move |offset| self.keys[(start + offset) % self.keys.len()].as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_csv_and_skips_blanks() {
        let pool = KeyPool::from_csv("key-a, key-b,, key-c ");
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.current(), Some("key-a"));
    }

    #[test]
    fn rotation_wraps_around() {
        let pool = KeyPool::from_csv("a,b");
        assert_eq!(pool.current(), Some("a"));
        pool.rotate();
        assert_eq!(pool.current(), Some("b"));
        pool.rotate();
        assert_eq!(pool.current(), Some("a"));
    }

    #[test]
    fn iteration_starts_at_cursor() {
        let pool = KeyPool::from_csv("a,b,c");
        pool.rotate();
        let keys: Vec<&str> = pool.iter_from_current().collect();
        assert_eq!(keys, vec!["b", "c", "a"]);
    }

    #[test]
    fn empty_pool() {
        let pool = KeyPool::from_csv("");
        assert!(pool.is_empty());
        assert_eq!(pool.current(), None);
        assert_eq!(pool.iter_from_current().count(), 0);
    }
}
