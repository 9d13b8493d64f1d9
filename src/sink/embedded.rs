//! Embedded-database sink (component I), grounded in `egress.py`'s `Egress`:
//! one embedded-db file per rotation window, a background compress+ship of
//! the just-closed file, and a downstream stream publish per batch.
//!
//! The teacher's own `db/` module targets a remote, client-server
//! Postgres/Timescale cluster — the opposite of "embedded" (see
//! DESIGN.md). This sink uses `sled` instead: an embedded, single-process,
//! rotatable key-value store, the closer structural match to the original
//! implementation's per-window SQLite file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::metrics::HydrationMetrics;
use crate::model::EnrichedRecord;
use crate::sink::object_store::ObjectStoreUploader;
use crate::sink::stream::StreamPublisher;
use crate::sink::Sink;

/// The sink's on-disk row shape — mirrors the embedded-database table the
/// original implementation used (spec §3, ambient data model additions).
#[derive(Debug, Serialize)]
struct StoredRecordRow<'a> {
    at_uri: &'a str,
    did: &'a str,
    time_us: Option<i64>,
    message: &'a serde_json::Value,
    hydrated_metadata: &'a crate::model::HydratedMetadata,
}

struct OpenDb {
    db: sled::Db,
    path: PathBuf,
    opened_at: Instant,
}

pub struct SledSink {
    db_dir: PathBuf,
    rotation_window: Duration,
    current: Mutex<OpenDb>,
    stream: Arc<dyn StreamPublisher>,
    uploader: Arc<dyn ObjectStoreUploader>,
    ship_tasks: Mutex<JoinSet<()>>,
    metrics: Option<HydrationMetrics>,
}

impl SledSink {
    pub async fn open(
        db_dir: impl Into<PathBuf>,
        rotation_window: Duration,
        stream: Arc<dyn StreamPublisher>,
        uploader: Arc<dyn ObjectStoreUploader>,
        metrics: Option<HydrationMetrics>,
    ) -> AppResult<Self> {
        let db_dir = db_dir.into();
        std::fs::create_dir_all(&db_dir)?;
        let current = Mutex::new(open_new_db(&db_dir)?);
        Ok(Self {
            db_dir,
            rotation_window,
            current,
            stream,
            uploader,
            ship_tasks: Mutex::new(JoinSet::new()),
            metrics,
        })
    }

    /// Rotate to a fresh db file if the window has elapsed, spawning a
    /// background compress+ship of the just-closed file. Returns the db
    /// handle to write the incoming batch into.
    async fn db_for_write(&self) -> AppResult<sled::Db> {
        let mut guard = self.current.lock().await;
        if guard.opened_at.elapsed() >= self.rotation_window {
            let old_path = guard.path.clone();
            let new = open_new_db(&self.db_dir)?;
            let old = std::mem::replace(&mut *guard, new);
            old.db.flush_async().await.map_err(AppError::Sled)?;
            drop(old.db);

            if let Some(m) = &self.metrics {
                m.sink_rotations_total.inc();
            }
            info!(path = %old_path.display(), "rotating embedded-db file");

            let uploader = self.uploader.clone();
            self.ship_tasks.lock().await.spawn(async move {
                if let Err(e) = compress_and_ship(&old_path, uploader).await {
                    error!(path = %old_path.display(), error = %e, "failed to compress/ship rotated db file");
                }
            });
        }
        Ok(guard.db.clone())
    }

    /// Drain outstanding ship tasks with a bounded grace period. Best-effort:
    /// resolves the open question in spec §9 about the original
    /// implementation's untracked fire-and-forget ship task, without
    /// changing the sink's at-least-once contract.
    pub async fn drain_ship_tasks(&self, grace: Duration) {
        let mut tasks = self.ship_tasks.lock().await;
        let _ = tokio::time::timeout(grace, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!(error = %e, "db-ship task panicked");
                }
            }
        })
        .await;
    }
}

fn open_new_db(db_dir: &Path) -> AppResult<OpenDb> {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%.f");
    let path = db_dir.join(format!("jetstream_{timestamp}.sled"));
    let db = sled::open(&path).map_err(AppError::Sled)?;
    Ok(OpenDb {
        db,
        path,
        opened_at: Instant::now(),
    })
}

/// `sled::open` creates a directory of data/log files, not a single file, so
/// it can't be read with `std::fs::read` the way a SQLite file could. Walk
/// the directory recursively and concatenate every entry as
/// `[path_len][path_bytes][data_len][data_bytes]` so the whole store round
/// trips through one gzip stream. No `tar` crate is in the dependency
/// surface, so this is a minimal hand-rolled framing rather than a real
/// archive format — ship-side only needs to reconstruct the same directory.
fn archive_dir(dir: &Path) -> std::io::Result<Vec<u8>> {
    fn walk(root: &Path, dir: &Path, buf: &mut Vec<u8>) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                walk(root, &path, buf)?;
                continue;
            }
            let rel = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            let data = std::fs::read(&path)?;
            buf.extend_from_slice(&(rel.len() as u32).to_be_bytes());
            buf.extend_from_slice(rel.as_bytes());
            buf.extend_from_slice(&(data.len() as u64).to_be_bytes());
            buf.extend_from_slice(&data);
        }
        Ok(())
    }
    let mut buf = Vec::new();
    walk(dir, dir, &mut buf)?;
    Ok(buf)
}

async fn compress_and_ship(
    old_path: &Path,
    uploader: Arc<dyn ObjectStoreUploader>,
) -> AppResult<()> {
    if !old_path.exists() {
        return Ok(());
    }
    let gz_path = old_path.with_extension("sled.gz");
    let old_path_owned = old_path.to_path_buf();
    let gz_path_clone = gz_path.clone();
    tokio::task::spawn_blocking(move || -> AppResult<()> {
        let raw = archive_dir(&old_path_owned)?;
        let file = std::fs::File::create(&gz_path_clone)?;
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(&raw)?;
        encoder.finish()?;
        Ok(())
    })
    .await
    .map_err(AppError::TaskJoin)??;

    let remote_key = gz_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("rotated.sled.gz")
        .to_string();
    uploader.upload(&gz_path, &remote_key).await?;

    if let Err(e) = std::fs::remove_dir_all(old_path) {
        tracing::warn!(path = %old_path.display(), error = %e, "failed to remove shipped db directory");
    }
    if let Err(e) = std::fs::remove_file(&gz_path) {
        tracing::warn!(path = %gz_path.display(), error = %e, "failed to remove shipped gz file");
    }
    Ok(())
}

#[async_trait]
impl Sink for SledSink {
    async fn store(&self, batch: &[EnrichedRecord]) -> AppResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let started_at = Instant::now();
        let db = self.db_for_write().await?;
        for record in batch {
            let row = StoredRecordRow {
                at_uri: &record.at_uri,
                did: &record.did,
                time_us: record.time_us,
                message: &record.message.0,
                hydrated_metadata: &record.hydrated_metadata,
            };
            let key = db.generate_id().map_err(AppError::Sled)?.to_be_bytes();
            let value = serde_json::to_vec(&row)?;
            db.insert(key, value).map_err(AppError::Sled)?;
        }
        db.flush_async().await.map_err(AppError::Sled)?;
        if let Some(m) = &self.metrics {
            m.observe_sink_write_latency(started_at.elapsed().as_secs_f64());
        }

        self.stream.publish(batch).await
    }

    async fn close(&self) -> AppResult<()> {
        let guard = self.current.lock().await;
        guard.db.flush_async().await.map_err(AppError::Sled)?;
        drop(guard);
        self.drain_ship_tasks(Duration::from_secs(5)).await;
        Ok(())
    }
}
