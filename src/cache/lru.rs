//! LRU Cache (component A).
//!
//! Bounded insertion-ordered map with move-on-access. Not concurrency-safe by
//! itself — callers synchronize (see `crate::context::HydrationContext`).
//!
//! Wraps the `lru` crate's intrusive doubly-linked-list + hash-index map
//! rather than hand-rolling one: it already gives O(1) `get`/`put` with
//! move-to-MRU semantics, and only `get`/`set`/`len`/`capacity` are exposed
//! here so callers can't reach past the ordering invariants.

use std::num::NonZeroUsize;

use lru::LruCache as RawLru;
use serde_json::Value as Json;

/// Bounded insertion-ordered string-keyed cache with move-on-access.
pub struct LruCache {
    inner: RawLru<String, Json>,
}

impl LruCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            inner: RawLru::new(capacity),
        }
    }

    /// Returns the value and promotes `key` to most-recently-used, or `None`
    /// without touching ordering if absent.
    pub fn get(&mut self, key: &str) -> Option<Json> {
        self.inner.get(key).cloned()
    }

    /// Peek without promoting — used where the spec permits probing without
    /// MRU promotion (phase 2 of the coordinator).
    pub fn peek(&self, key: &str) -> Option<Json> {
        self.inner.peek(key).cloned()
    }

    /// Insert or update `key`. Updating an existing key never evicts;
    /// inserting into a full map evicts exactly the LRU entry.
    pub fn set(&mut self, key: String, value: Json) {
        self.inner.put(key, value);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn size_never_exceeds_capacity() {
        let mut c = LruCache::new(2);
        c.set("a".into(), json!(1));
        c.set("b".into(), json!(2));
        c.set("c".into(), json!(3));
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn get_promotes_to_mru_and_protects_from_eviction() {
        let mut c = LruCache::new(2);
        c.set("a".into(), json!(1));
        c.set("b".into(), json!(2));
        // touch "a" so it becomes MRU; "b" becomes LRU
        assert_eq!(c.get("a"), Some(json!(1)));
        c.set("c".into(), json!(3));
        // "b" should have been evicted, not "a"
        assert_eq!(c.get("b"), None);
        assert_eq!(c.get("a"), Some(json!(1)));
        assert_eq!(c.get("c"), Some(json!(3)));
    }

    #[test]
    fn overwrite_does_not_evict() {
        let mut c = LruCache::new(2);
        c.set("a".into(), json!(1));
        c.set("b".into(), json!(2));
        c.set("a".into(), json!(99));
        assert_eq!(c.len(), 2);
        assert_eq!(c.get("a"), Some(json!(99)));
        assert_eq!(c.get("b"), Some(json!(2)));
    }

    #[test]
    fn miss_does_not_change_state() {
        let mut c = LruCache::new(2);
        c.set("a".into(), json!(1));
        assert_eq!(c.get("missing"), None);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn eviction_order_is_inverse_access_order() {
        let mut c = LruCache::new(3);
        c.set("a".into(), json!(1));
        c.set("b".into(), json!(2));
        c.set("c".into(), json!(3));
        // access order a, c, b -> LRU is a
        let _ = c.get("c");
        let _ = c.get("b");
        c.set("d".into(), json!(4));
        assert_eq!(c.get("a"), None);
        assert!(c.get("b").is_some());
        assert!(c.get("c").is_some());
        assert!(c.get("d").is_some());
    }
}
