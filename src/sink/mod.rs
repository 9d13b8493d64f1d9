//! Sink (component I): where enriched batches end up.
//!
//! Just the trait here — concrete embedded-storage, object-store, and
//! stream-publish implementations live in sibling modules and are composed
//! by the driver.

pub mod embedded;
pub mod object_store;
pub mod stream;

pub use embedded::SledSink;
pub use object_store::{LoggingUploader, ObjectStoreUploader};
pub use stream::StreamPublisher;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::model::EnrichedRecord;

#[async_trait]
pub trait Sink: Send + Sync {
    async fn store(&self, batch: &[EnrichedRecord]) -> AppResult<()>;
    async fn close(&self) -> AppResult<()>;
}
