//! Round-robin credential rotation

use parking_lot::Mutex;

/// Opaque selector for a credential slot.
///
/// A request starts from the base returned by [`KeyRotation::begin_request`];
/// top-level group `g` uses `base.offset(g)` and each retry shifts one more slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RotationKey(pub usize);

impl RotationKey {
    /// Key shifted by `n` slots, used to move to another credential on retry
    pub fn offset(self, n: usize) -> Self {
        Self(self.0.wrapping_add(n))
    }
}

/// Credential pool with a shared cursor
#[derive(Debug)]
pub struct KeyRotation {
    keys: Vec<String>,
    cursor: Mutex<usize>,
}

impl KeyRotation {
    /// Create a rotation over `keys`; an empty pool yields no credentials
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            cursor: Mutex::new(0),
        }
    }

    /// Number of credentials in the pool
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the pool is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Reserve the starting slot for one request and advance the cursor by one.
    ///
    /// Reading and advancing happen under one lock, so concurrent requests
    /// never start from the same cursor value.
    pub fn begin_request(&self) -> RotationKey {
        if self.keys.is_empty() {
            return RotationKey::default();
        }

        let mut cursor = self.cursor.lock();
        let base = *cursor;
        *cursor = (base + 1) % self.keys.len();
        RotationKey(base)
    }

    /// Credential for `key`: slot = key % n. Does not touch the cursor.
    pub fn next(&self, key: RotationKey) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }

        let n = self.keys.len();
        let slot = key.0 % n;
        tracing::debug!("Using credential slot {} of {}", slot + 1, n);
        Some(self.keys[slot].as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    fn rotation(n: usize) -> KeyRotation {
        KeyRotation::new((0..n).map(|i| format!("key-{}", i)).collect())
    }

    #[test]
    fn test_cursor_advances_per_request() {
        let rotation = rotation(3);
        assert_eq!(rotation.begin_request(), RotationKey(0));
        assert_eq!(rotation.begin_request(), RotationKey(1));
        assert_eq!(rotation.begin_request(), RotationKey(2));
        assert_eq!(rotation.begin_request(), RotationKey(0));

        // Lookups never move the cursor
        assert_eq!(rotation.next(RotationKey(7)), Some("key-1"));
        assert_eq!(rotation.next(RotationKey(7)), Some("key-1"));
        assert_eq!(rotation.begin_request(), RotationKey(1));
    }

    #[test]
    fn test_groups_of_one_request_use_distinct_keys() {
        let rotation = rotation(12);
        let _ = rotation.begin_request();
        let base = rotation.begin_request();

        let used: HashSet<&str> = (0..12)
            .filter_map(|g| rotation.next(base.offset(g)))
            .collect();
        assert_eq!(used.len(), 12);
        assert_eq!(rotation.next(base), Some("key-1"));

        // A retry of the last group wraps onto the first slot of the request
        assert_eq!(rotation.next(base.offset(11).offset(1)), Some("key-1"));
    }

    #[test]
    fn test_empty_pool() {
        let rotation = KeyRotation::new(Vec::new());
        assert!(rotation.is_empty());
        assert_eq!(rotation.begin_request(), RotationKey(0));
        assert_eq!(rotation.next(RotationKey(4)), None);
    }

    #[test]
    fn test_concurrent_callers_spread_evenly() {
        let rotation = Arc::new(rotation(3));
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let rotation = Arc::clone(&rotation);
                std::thread::spawn(move || {
                    (0..30)
                        .map(|_| rotation.next(rotation.begin_request()).map(str::to_string))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for handle in handles {
            for key in handle.join().unwrap().into_iter().flatten() {
                *counts.entry(key).or_default() += 1;
            }
        }

        assert_eq!(counts.len(), 3);
        assert!(counts.values().all(|&c| c == 100));
    }
}
