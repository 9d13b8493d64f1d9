pub mod jetstream;

pub use jetstream::JetstreamSource;

use async_trait::async_trait;

use crate::model::RawEvent;

/// Source interface (consumed, spec §6): an async iterator of `RawEvent`s.
/// Malformed frames are skipped upstream of this trait — `next()` only ever
/// yields frames that parsed. End of iteration (`None`) terminates the
/// pipeline; there is no reconnect logic inside the core (spec §4.F).
#[async_trait]
pub trait EventSource: Send {
    async fn next(&mut self) -> Option<RawEvent>;
}
