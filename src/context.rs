//! Process-wide cache state, explicit rather than module-level.
//!
//! Design Note (spec §9): in a systems-language rewrite, bind the two
//! caches and their lock to an explicit value passed into every `hydrate`
//! call, rather than hiding them behind module-level statics. `HydrationContext`
//! is that value — the driver builds one at startup and clones the `Arc`
//! into every dispatched hydration task. This keeps cache lifetime and test
//! isolation explicit: a test can build a fresh, small `HydrationContext`
//! without touching any process-wide state.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::LruCache;

/// Both caches behind a single readers-writer lock (spec §5/§9: one lock is
/// adequate because every batch touches both caches, and splitting into two
/// locks is only a valid optimization once benchmarks show contention — and
/// then only with a fixed lock ordering, profile-then-post, to avoid
/// deadlock).
pub struct Caches {
    pub profiles: LruCache,
    pub posts: LruCache,
}

#[derive(Clone)]
pub struct HydrationContext {
    caches: Arc<RwLock<Caches>>,
}

impl HydrationContext {
    pub fn new(profile_cache_size: usize, post_cache_size: usize) -> Self {
        Self {
            caches: Arc::new(RwLock::new(Caches {
                profiles: LruCache::new(profile_cache_size),
                posts: LruCache::new(post_cache_size),
            })),
        }
    }

    pub(crate) fn caches(&self) -> &Arc<RwLock<Caches>> {
        &self.caches
    }
}
