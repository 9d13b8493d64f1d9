//! Object-store uploader (ambient, consumed external interface, spec §6):
//! `upload(local_path, remote_key) -> AppResult<()>`.
//!
//! Only a trait plus a logging/no-op default ship in this core. No S3/GCS
//! SDK is available anywhere in this codebase's dependency surface, and
//! fabricating one would violate the "never fabricate dependencies" rule
//! (spec Non-goals — "a production-grade object-store client ... is a
//! deployment concern, not a core one"). A real backend is a deployment-time
//! swap behind this same trait.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::error::AppResult;

#[async_trait]
pub trait ObjectStoreUploader: Send + Sync {
    async fn upload(&self, local_path: &Path, remote_key: &str) -> AppResult<()>;
}

/// Logs the would-be upload and returns success. Exactly the "commented
/// scaffolding for functionality not currently wired up" pattern the teacher
/// uses elsewhere (e.g. its Redis client), except this boundary is a live
/// trait rather than dead code — swapping in a real backend touches nothing
/// else in the sink.
pub struct LoggingUploader {
    pub bucket: String,
}

#[async_trait]
impl ObjectStoreUploader for LoggingUploader {
    async fn upload(&self, local_path: &Path, remote_key: &str) -> AppResult<()> {
        info!(
            bucket = %self.bucket,
            path = %local_path.display(),
            remote_key,
            "object-store upload stubbed (no backend configured)"
        );
        Ok(())
    }
}
