//! Pipeline Driver (component F): wires a source, the batcher, and a sink
//! into one run loop. Grounded in the teacher's `ingest/ws/ws_client.rs` read
//! loop shape, generalized from "one exchange's websocket" to "one
//! `EventSource`".

use tracing::info;

use crate::batch::Batcher;
use crate::source::EventSource;

/// Read events from `source` until it ends, handing each to `batcher`. On
/// end-of-stream, flushes the trailing partial batch and drains every
/// in-flight hydration task before returning.
pub async fn run(mut source: Box<dyn EventSource>, mut batcher: Batcher) {
    let mut received = 0u64;
    while let Some(event) = source.next().await {
        received += 1;
        batcher.ingest(event).await;
    }
    info!(received, "source ended, flushing remaining batch");
    batcher.flush().await;
    batcher.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientPool;
    use crate::client::bluesky_api::SocialClient;
    use crate::context::HydrationContext;
    use crate::error::AppResult;
    use crate::model::{EnrichedRecord, RawEvent};
    use crate::sink::Sink;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    struct VecSource {
        events: Vec<RawEvent>,
    }

    #[async_trait]
    impl EventSource for VecSource {
        async fn next(&mut self) -> Option<RawEvent> {
            if self.events.is_empty() {
                None
            } else {
                Some(self.events.remove(0))
            }
        }
    }

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
        stored: Mutex<Vec<EnrichedRecord>>,
    }

    #[async_trait]
    impl Sink for RecordingSink {
        async fn store(&self, batch: &[EnrichedRecord]) -> AppResult<()> {
            self.stored.lock().unwrap().extend_from_slice(batch);
            Ok(())
        }
        async fn close(&self) -> AppResult<()> {
            Ok(())
        }
    }

    fn event(did: &str) -> RawEvent {
        RawEvent(json!({
            "did": did,
            "time_us": 1,
            "commit": { "collection": "app.bsky.feed.post", "rkey": "r", "record": {} },
        }))
    }

    #[tokio::test]
    async fn drains_the_source_and_flushes_the_trailing_partial_batch() {
        let source: Box<dyn EventSource> = Box::new(VecSource {
            events: vec![event("did:plc:a"), event("did:plc:b"), event("did:plc:c")],
        });
        let ctx = HydrationContext::new(10, 10);
        let pool = Arc::new(ClientPool::from_clients(vec![Arc::new(EchoClient)]));
        let sink = Arc::new(RecordingSink { stored: Mutex::new(Vec::new()) });
        let batcher = Batcher::new(2, 10, None, ctx, pool, sink.clone(), None);

        run(source, batcher).await;

        assert_eq!(sink.stored.lock().unwrap().len(), 3);
    }
}
