mod appconfig;
mod batch;
mod cache;
mod cli;
mod client;
mod context;
mod credentials;
mod driver;
mod error;
mod hydration;
mod metrics;
mod model;
mod prometheus;
mod refs;
mod sink;
mod source;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::appconfig::AppConfig;
use crate::batch::{Batcher, ShardFilter};
use crate::client::ClientPool;
use crate::cli::Cli;
use crate::context::HydrationContext;
use crate::credentials::{CredentialSource, HttpCredentialSource};
use crate::error::{AppError, AppResult};
use crate::metrics::HydrationMetrics;
use crate::prometheus::{run_metrics_server, PrometheusConfig};
use crate::sink::{LoggingUploader, Sink, SledSink, StreamPublisher};
use crate::sink::stream::RedisStreamPublisher;
use crate::source::{EventSource, JetstreamSource};

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> AppResult<()> {
    let mut config: AppConfig = appconfig::load_app_config(&cli.config)?;
    if let Some(modulo) = cli.modulo {
        config.hydration.modulo = modulo;
    }
    if let Some(shard) = cli.shard {
        config.hydration.shard = shard;
    }

    init_logging(&config.logging.level);
    tracing::info!(config_path = %cli.config, "starting hydration pipeline");

    let metrics = HydrationMetrics::new()?;
    let prometheus_cfg = PrometheusConfig::from(&config.metrics);
    let metrics_for_server = metrics.clone();
    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(prometheus_cfg, move || metrics_for_server.gather()).await {
            tracing::error!(error = %e, "metrics server exited");
        }
    });

    let http = reqwest::Client::builder().build().map_err(AppError::Reqwest)?;
    let credential_source = HttpCredentialSource::new(
        http,
        config.credentials.base_url.clone(),
        config.credentials.secret.clone(),
    );
    let session_strings = credential_source.fetch().await?;

    let pool = ClientPool::load(session_strings, config.hydration.client_bandwidth).await?;
    if pool.is_empty() {
        return Err(AppError::EmptyClientPool);
    }
    let pool = Arc::new(pool);

    let ctx = HydrationContext::new(config.hydration.user_cache_size, config.hydration.post_cache_size);

    let stream: Arc<dyn StreamPublisher> = Arc::new(
        RedisStreamPublisher::connect(
            &config.sink.redis_url,
            config.sink.stream_key.clone(),
            config.sink.stream_trim_maxlen,
        )
        .await?,
    );
    let uploader = Arc::new(LoggingUploader {
        bucket: config.sink.object_store_bucket.clone(),
    });
    let sink: Arc<dyn Sink> = Arc::new(
        SledSink::open(
            config.sink.db_dir.clone(),
            Duration::from_secs(config.sink.rotation_minutes * 60),
            stream,
            uploader,
            Some(metrics.clone()),
        )
        .await?,
    );

    let source: Box<dyn EventSource> = Box::new(
        JetstreamSource::connect(&config.source.hosts, &config.source.wanted_collections).await?,
    );

    let filter = ShardFilter::new(config.hydration.modulo, config.hydration.shard);
    let batcher = Batcher::new(
        config.hydration.batch_size,
        config.hydration.max_in_flight_batches,
        filter,
        ctx,
        pool,
        sink.clone(),
        Some(metrics),
    );

    driver::run(source, batcher).await;

    sink.close().await?;
    tracing::info!("hydration pipeline shut down cleanly");
    Ok(())
}

/// Built manually rather than via `#[tokio::main]` so `--workers` can size
/// the runtime before anything async starts.
fn main() {
    let cli = Cli::parse();
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(workers) = cli.workers {
        builder.worker_threads(workers.max(1));
    }
    let runtime = builder.build().expect("failed to build tokio runtime");

    if let Err(e) = runtime.block_on(run(cli)) {
        tracing::error!(error = %e, "fatal error, exiting");
        std::process::exit(1);
    }
}
