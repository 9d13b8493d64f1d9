//! Hydration Coordinator (component C) — the core of the pipeline.
//!
//! Five phases per batch, grounded in `hydration.py`'s `hydrate_events`:
//!
//! 1. extract references from every event in the batch, accumulating the
//!    batch-wide sets of DIDs and AT-URIs that need a profile/post lookup.
//! 2. probe both caches (without promoting) to find what's actually missing.
//! 3. issue the two bulk remote calls concurrently, each internally chunked.
//! 4. merge fetched values into the caches, then read every needed key back
//!    out (this promotes cache hits to MRU too, not just fresh fetches).
//! 5. assemble one `EnrichedRecord` per input event from the lookup maps.
//!
//! A failure in phase 3 abandons the whole batch before any cache mutation —
//! partial remote failures must never leave partially-hydrated state behind
//! (spec §7.2).

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tracing::{debug, instrument};

use crate::client::ClientPool;
use crate::context::HydrationContext;
use crate::error::AppResult;
use crate::metrics::HydrationMetrics;
use crate::model::{EnrichedRecord, HydratedMetadata, RawEvent};
use crate::refs::{self, EventRefs};

#[instrument(skip_all, fields(batch_size = batch.len()))]
pub async fn hydrate(
    batch: &[RawEvent],
    ctx: &HydrationContext,
    pool: &ClientPool,
    metrics: Option<&HydrationMetrics>,
) -> AppResult<Vec<EnrichedRecord>> {
    if batch.is_empty() {
        return Ok(Vec::new());
    }

    let started_at = Instant::now();

    // Phase 1: extract references, accumulate batch-wide lookup sets.
    let per_event: Vec<EventRefs> = batch
        .iter()
        .enumerate()
        .map(|(i, e)| refs::extract(e, i))
        .collect();

    let mut all_dids: HashSet<String> = HashSet::new();
    let mut all_uris: HashSet<String> = HashSet::new();
    for r in &per_event {
        if !r.did.is_empty() {
            all_dids.insert(r.did.clone());
        }
        all_dids.extend(r.mentions.iter().cloned());
        all_uris.extend(r.parent_uri.iter().cloned());
        all_uris.extend(r.root_uri.iter().cloned());
        all_uris.extend(r.quote_uri.iter().cloned());
    }

    // Phase 2: probe caches without promoting, to find what's missing.
    let (missing_dids, missing_uris) = {
        let caches = ctx.caches().read().await;
        let mut missing_dids = Vec::new();
        let mut missing_uris = Vec::new();
        for did in &all_dids {
            if caches.profiles.peek(did).is_some() {
                if let Some(m) = metrics {
                    m.profile_cache_hits_total.inc();
                }
            } else {
                if let Some(m) = metrics {
                    m.profile_cache_misses_total.inc();
                }
                missing_dids.push(did.clone());
            }
        }
        for uri in &all_uris {
            if caches.posts.peek(uri).is_some() {
                if let Some(m) = metrics {
                    m.post_cache_hits_total.inc();
                }
            } else {
                if let Some(m) = metrics {
                    m.post_cache_misses_total.inc();
                }
                missing_uris.push(uri.clone());
            }
        }
        (missing_dids, missing_uris)
    };

    debug!(
        missing_dids = missing_dids.len(),
        missing_uris = missing_uris.len(),
        "resolved batch lookup set"
    );

    // Phase 3: bulk-fetch whatever is missing, both calls concurrently. Any
    // error here abandons the batch before touching either cache.
    let client = pool.pick();
    if let Some(m) = metrics {
        m.remote_calls_total.inc_by(2);
    }
    let remote_call_started_at = Instant::now();
    let (fetched_profiles, fetched_posts) = tokio::try_join!(
        client.get_profiles(&missing_dids),
        client.get_posts(&missing_uris),
    )?;
    if let Some(m) = metrics {
        m.observe_remote_call_latency(remote_call_started_at.elapsed().as_secs_f64());
    }

    // Phase 4: merge into the caches, then read every needed key back out —
    // this promotes pre-existing cache hits to MRU as well as fresh fetches.
    let (did_to_profile, uri_to_post) = {
        let mut caches = ctx.caches().write().await;
        for (did, profile) in fetched_profiles {
            caches.profiles.set(did, profile);
        }
        for (uri, post) in fetched_posts {
            caches.posts.set(uri, post);
        }

        let mut did_to_profile = HashMap::new();
        for did in &all_dids {
            did_to_profile.insert(did.clone(), caches.profiles.get(did));
        }
        let mut uri_to_post = HashMap::new();
        for uri in &all_uris {
            uri_to_post.insert(uri.clone(), caches.posts.get(uri));
        }
        (did_to_profile, uri_to_post)
    };

    // Phase 5: assemble one enriched record per input event.
    let mut out = Vec::with_capacity(batch.len());
    for (event, r) in batch.iter().zip(per_event.iter()) {
        let at_uri = EnrichedRecord::at_uri_for(
            &r.did,
            event.collection().unwrap_or_default(),
            event.rkey().unwrap_or_default(),
        );

        let mentions = r
            .mentions
            .iter()
            .map(|did| (did.clone(), did_to_profile.get(did).cloned().flatten()))
            .collect();

        let hydrated_metadata = HydratedMetadata {
            user: did_to_profile.get(&r.did).cloned().flatten(),
            mentions,
            parent_post: r
                .parent_uri
                .as_ref()
                .and_then(|u| uri_to_post.get(u).cloned().flatten()),
            reply_post: r
                .root_uri
                .as_ref()
                .and_then(|u| uri_to_post.get(u).cloned().flatten()),
            quote_post: r
                .quote_uri
                .as_ref()
                .and_then(|u| uri_to_post.get(u).cloned().flatten()),
        };

        out.push(EnrichedRecord {
            at_uri,
            did: r.did.clone(),
            time_us: event.time_us(),
            message: event.clone(),
            hydrated_metadata,
        });
    }

    if let Some(m) = metrics {
        m.events_hydrated_total.inc_by(out.len() as u64);
        m.observe_hydration_latency(started_at.elapsed().as_secs_f64());
    }

    Ok(out)
}
