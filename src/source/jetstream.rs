//! Jetstream Source (component G, ambient): a concrete `EventSource` that
//! subscribes to one Bluesky jetstream host over websocket.
//!
//! Grounded in `client.py`'s `JetstreamClient` for the URL shape and the
//! skip-on-parse-error behavior, and in the teacher's
//! `ingest/ws/ws_client.rs` for the `connect_async` + `StreamExt` read-loop
//! shape. Unlike the teacher's multi-exchange reconnect loop, there is no
//! reconnect here: a disconnect ends the run (spec §4.F/§4.G — reconnection
//! is the caller's concern, and this binary has no caller above the driver).

use futures_util::StreamExt;
use rand::seq::IndexedRandom;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::model::RawEvent;
use crate::source::EventSource;

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

pub struct JetstreamSource {
    ws: WsStream,
}

impl JetstreamSource {
    /// Connect to one host chosen uniformly at random from `hosts`, mirroring
    /// the original implementation's `random.choice(settings.jetstream_hosts)`.
    pub async fn connect(hosts: &[String], wanted_collections: &str) -> AppResult<Self> {
        let host = hosts
            .choose(&mut rand::rng())
            .ok_or_else(|| AppError::InvalidConfig("source.hosts must not be empty".into()))?;
        let url = format!("wss://{host}/subscribe?wantedCollections={wanted_collections}");
        info!(%url, "jetstream connecting");
        let (ws, _resp) = connect_async(&url).await?;
        Ok(Self { ws })
    }
}

#[async_trait::async_trait]
impl EventSource for JetstreamSource {
    async fn next(&mut self) -> Option<RawEvent> {
        loop {
            let frame = self.ws.next().await?;
            let frame = match frame {
                Ok(f) => f,
                Err(e) => {
                    warn!(error = %e, "jetstream websocket error, ending stream");
                    return None;
                }
            };
            let text = match frame {
                Message::Text(t) => t.to_string(),
                Message::Close(_) => return None,
                _ => continue,
            };
            match serde_json::from_str(&text) {
                Ok(value) => return Some(RawEvent(value)),
                Err(e) => {
                    warn!(error = %e, "skipping malformed jetstream frame");
                    continue;
                }
            }
        }
    }
}
