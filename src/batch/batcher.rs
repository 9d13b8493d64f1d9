//! Batcher / Admission Controller (component E).
//!
//! Buffers filtered events, slices off fixed-size batches, and dispatches
//! each as a background hydration task gated by a counting semaphore of
//! *P* permits. Dispatch returns as soon as a permit is acquired, not when
//! the batch finishes — backpressure comes from semaphore exhaustion, not
//! from awaiting the hydration itself.
//!
//! Every dispatched task is tracked in a `JoinSet` so `shutdown` can drain
//! outstanding work instead of leaking it fire-and-forget.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, warn};
use uuid::Uuid;

use crate::batch::filter::ShardFilter;
use crate::client::ClientPool;
use crate::context::HydrationContext;
use crate::hydration;
use crate::metrics::HydrationMetrics;
use crate::model::RawEvent;
use crate::sink::Sink;

pub const DEFAULT_ADMISSION_PERMITS: usize = 100;

pub struct Batcher {
    batch_size: usize,
    filter: Option<ShardFilter>,
    buffer: VecDeque<RawEvent>,
    semaphore: Arc<Semaphore>,
    ctx: HydrationContext,
    pool: Arc<ClientPool>,
    sink: Arc<dyn Sink>,
    metrics: Option<HydrationMetrics>,
    inflight: JoinSet<()>,
}

impl Batcher {
    pub fn new(
        batch_size: usize,
        admission_permits: usize,
        filter: Option<ShardFilter>,
        ctx: HydrationContext,
        pool: Arc<ClientPool>,
        sink: Arc<dyn Sink>,
        metrics: Option<HydrationMetrics>,
    ) -> Self {
        Self {
            batch_size: batch_size.max(1),
            filter,
            buffer: VecDeque::new(),
            semaphore: Arc::new(Semaphore::new(admission_permits)),
            ctx,
            pool,
            sink,
            metrics,
            inflight: JoinSet::new(),
        }
    }

    /// Apply the shard filter, buffer the event if admitted, and dispatch
    /// every full batch the buffer now contains.
    pub async fn ingest(&mut self, event: RawEvent) {
        if let Some(filter) = &self.filter {
            if !filter.admits(&event) {
                return;
            }
        }
        self.buffer.push_back(event);
        while self.buffer.len() >= self.batch_size {
            let batch: Vec<RawEvent> = self.buffer.drain(..self.batch_size).collect();
            self.dispatch(batch).await;
        }
    }

    /// End-of-stream: dispatch whatever partial batch remains.
    pub async fn flush(&mut self) {
        if !self.buffer.is_empty() {
            let batch: Vec<RawEvent> = self.buffer.drain(..).collect();
            self.dispatch(batch).await;
        }
    }

    async fn dispatch(&mut self, batch: Vec<RawEvent>) {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("admission semaphore is never closed while the batcher is alive");

        let ctx = self.ctx.clone();
        let pool = self.pool.clone();
        let sink = self.sink.clone();
        let metrics = self.metrics.clone();
        let batch_id = Uuid::new_v4();

        if let Some(m) = &metrics {
            m.batches_dispatched_total.inc();
            m.admission_queue_depth.inc();
        }

        self.inflight.spawn(async move {
            let _permit = permit;
            match hydration::hydrate(&batch, &ctx, &pool, metrics.as_ref()).await {
                Ok(records) => {
                    if let Err(e) = sink.store(&records).await {
                        error!(%batch_id, error = %e, "sink store failed, batch dropped");
                        if let Some(m) = &metrics {
                            m.batches_failed_total.inc();
                        }
                    } else if let Some(m) = &metrics {
                        m.batches_completed_total.inc();
                    }
                }
                Err(e) => {
                    warn!(%batch_id, error = %e, "batch hydration failed, batch dropped");
                    if let Some(m) = &metrics {
                        m.batches_failed_total.inc();
                    }
                }
            }
            if let Some(m) = &metrics {
                m.admission_queue_depth.dec();
            }
        });
    }

    /// Join every outstanding hydration task. Resolves the fire-and-forget
    /// dispatch model's only loose end: nothing is left running once this
    /// returns.
    pub async fn shutdown(mut self) {
        while let Some(res) = self.inflight.join_next().await {
            if let Err(e) = res {
                error!(error = %e, "hydration task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::bluesky_api::SocialClient;
    use crate::error::AppResult;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct EchoClient;

    #[async_trait]
    impl SocialClient for EchoClient {
        async fn get_profiles(&self, dids: &[String]) -> AppResult<HashMap<String, Value>> {
            Ok(dids.iter().map(|d| (d.clone(), json!({ "did": d }))).collect())
        }
        async fn get_posts(&self, uris: &[String]) -> AppResult<HashMap<String, Value>> {
            Ok(uris.iter().map(|u| (u.clone(), json!({ "uri": u }))).collect())
        }
    }

    struct RecordingSink {
        stored: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Sink for RecordingSink {
        async fn store(&self, batch: &[crate::model::EnrichedRecord]) -> AppResult<()> {
            self.stored.lock().unwrap().push(batch.len());
            Ok(())
        }

        async fn close(&self) -> AppResult<()> {
            Ok(())
        }
    }

    fn event(did: &str, t: i64) -> RawEvent {
        RawEvent(json!({
            "did": did,
            "time_us": t,
            "commit": { "collection": "app.bsky.feed.post", "rkey": "r", "record": {} },
        }))
    }

    #[tokio::test]
    async fn dispatches_full_batches_and_flushes_the_remainder() {
        let ctx = HydrationContext::new(10, 10);
        let pool = Arc::new(ClientPool::from_clients(vec![Arc::new(EchoClient)]));
        let sink = Arc::new(RecordingSink { stored: Mutex::new(Vec::new()) });
        let mut batcher = Batcher::new(2, 10, None, ctx, pool, sink.clone(), None);

        batcher.ingest(event("did:plc:a", 1)).await;
        batcher.ingest(event("did:plc:b", 2)).await; // completes first batch of 2
        batcher.ingest(event("did:plc:c", 3)).await; // partial
        batcher.flush().await;
        batcher.shutdown().await;

        let stored = sink.stored.lock().unwrap();
        let mut sizes = stored.clone();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 2]);
    }

    #[tokio::test]
    async fn shard_filter_drops_events_outside_the_selected_residue() {
        let ctx = HydrationContext::new(10, 10);
        let pool = Arc::new(ClientPool::from_clients(vec![Arc::new(EchoClient)]));
        let sink = Arc::new(RecordingSink { stored: Mutex::new(Vec::new()) });
        let filter = ShardFilter::new(2, 0);
        let mut batcher = Batcher::new(5, 10, filter, ctx, pool, sink.clone(), None);

        batcher.ingest(event("did:plc:a", 1)).await; // shard 1, dropped
        batcher.ingest(event("did:plc:b", 2)).await; // shard 0, kept
        batcher.flush().await;
        batcher.shutdown().await;

        let stored = sink.stored.lock().unwrap();
        assert_eq!(*stored, vec![1]);
    }
}
