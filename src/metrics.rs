//! Process-wide Prometheus metrics for the hydration pipeline.
//!
//! Shaped the same way as the teacher's `ingest/metrics.rs`: a `Registry`
//! plus a flat set of counters/histograms/gauges, no labels by design to
//! avoid high cardinality, feature-gated behind `metrics` so the type still
//! exists (as a no-op) when the feature is off.

use crate::error::AppResult;

#[cfg(feature = "metrics")]
use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};

#[derive(Clone, Debug)]
pub struct HydrationMetrics {
    #[cfg(feature = "metrics")]
    registry: Registry,

    // --- Batches / throughput
    #[cfg(feature = "metrics")]
    pub batches_dispatched_total: IntCounter,
    #[cfg(feature = "metrics")]
    pub batches_completed_total: IntCounter,
    #[cfg(feature = "metrics")]
    pub batches_failed_total: IntCounter,
    #[cfg(feature = "metrics")]
    pub events_hydrated_total: IntCounter,

    // --- Cache
    #[cfg(feature = "metrics")]
    pub profile_cache_hits_total: IntCounter,
    #[cfg(feature = "metrics")]
    pub profile_cache_misses_total: IntCounter,
    #[cfg(feature = "metrics")]
    pub post_cache_hits_total: IntCounter,
    #[cfg(feature = "metrics")]
    pub post_cache_misses_total: IntCounter,

    // --- Remote calls
    #[cfg(feature = "metrics")]
    pub remote_calls_total: IntCounter,
    #[cfg(feature = "metrics")]
    pub remote_call_latency_seconds: Histogram,

    // --- Admission control
    #[cfg(feature = "metrics")]
    pub admission_queue_depth: IntGauge,
    #[cfg(feature = "metrics")]
    pub hydration_latency_seconds: Histogram,

    // --- Sink
    #[cfg(feature = "metrics")]
    pub sink_write_latency_seconds: Histogram,
    #[cfg(feature = "metrics")]
    pub sink_rotations_total: IntCounter,

    #[cfg(not(feature = "metrics"))]
    _noop: (),
}

impl HydrationMetrics {
    pub fn new() -> AppResult<Self> {
        #[cfg(feature = "metrics")]
        {
            let registry = Registry::new();

            let batches_dispatched_total = IntCounter::with_opts(Opts::new(
                "hydration_batches_dispatched_total",
                "Batches handed to the hydration coordinator",
            ))?;
            let batches_completed_total = IntCounter::with_opts(Opts::new(
                "hydration_batches_completed_total",
                "Batches successfully hydrated and stored",
            ))?;
            let batches_failed_total = IntCounter::with_opts(Opts::new(
                "hydration_batches_failed_total",
                "Batches abandoned due to a remote bulk-fetch or sink failure",
            ))?;
            let events_hydrated_total = IntCounter::with_opts(Opts::new(
                "hydration_events_hydrated_total",
                "Individual events successfully enriched",
            ))?;

            let profile_cache_hits_total = IntCounter::with_opts(Opts::new(
                "hydration_profile_cache_hits_total",
                "Profile cache probe hits",
            ))?;
            let profile_cache_misses_total = IntCounter::with_opts(Opts::new(
                "hydration_profile_cache_misses_total",
                "Profile cache probe misses",
            ))?;
            let post_cache_hits_total = IntCounter::with_opts(Opts::new(
                "hydration_post_cache_hits_total",
                "Post cache probe hits",
            ))?;
            let post_cache_misses_total = IntCounter::with_opts(Opts::new(
                "hydration_post_cache_misses_total",
                "Post cache probe misses",
            ))?;

            let remote_calls_total = IntCounter::with_opts(Opts::new(
                "hydration_remote_calls_total",
                "Bulk remote calls issued (profile + post, chunked)",
            ))?;
            let remote_call_latency_seconds = Histogram::with_opts(HistogramOpts::new(
                "hydration_remote_call_latency_seconds",
                "Latency of one bulk remote call",
            ))?;

            let admission_queue_depth = IntGauge::with_opts(Opts::new(
                "hydration_admission_queue_depth",
                "Approximate number of in-flight hydration batches",
            ))?;
            let hydration_latency_seconds = Histogram::with_opts(HistogramOpts::new(
                "hydration_latency_seconds",
                "End-to-end latency of one hydrate() call",
            ))?;

            let sink_write_latency_seconds = Histogram::with_opts(HistogramOpts::new(
                "hydration_sink_write_latency_seconds",
                "Latency of one sink store() call",
            ))?;
            let sink_rotations_total = IntCounter::with_opts(Opts::new(
                "hydration_sink_rotations_total",
                "Embedded-database rotation events",
            ))?;

            registry.register(Box::new(batches_dispatched_total.clone()))?;
            registry.register(Box::new(batches_completed_total.clone()))?;
            registry.register(Box::new(batches_failed_total.clone()))?;
            registry.register(Box::new(events_hydrated_total.clone()))?;
            registry.register(Box::new(profile_cache_hits_total.clone()))?;
            registry.register(Box::new(profile_cache_misses_total.clone()))?;
            registry.register(Box::new(post_cache_hits_total.clone()))?;
            registry.register(Box::new(post_cache_misses_total.clone()))?;
            registry.register(Box::new(remote_calls_total.clone()))?;
            registry.register(Box::new(remote_call_latency_seconds.clone()))?;
            registry.register(Box::new(admission_queue_depth.clone()))?;
            registry.register(Box::new(hydration_latency_seconds.clone()))?;
            registry.register(Box::new(sink_write_latency_seconds.clone()))?;
            registry.register(Box::new(sink_rotations_total.clone()))?;

            Ok(Self {
                registry,
                batches_dispatched_total,
                batches_completed_total,
                batches_failed_total,
                events_hydrated_total,
                profile_cache_hits_total,
                profile_cache_misses_total,
                post_cache_hits_total,
                post_cache_misses_total,
                remote_calls_total,
                remote_call_latency_seconds,
                admission_queue_depth,
                hydration_latency_seconds,
                sink_write_latency_seconds,
                sink_rotations_total,
            })
        }

        #[cfg(not(feature = "metrics"))]
        Ok(Self { _noop: () })
    }

    #[inline]
    pub fn observe_remote_call_latency(&self, _secs: f64) {
        #[cfg(feature = "metrics")]
        self.remote_call_latency_seconds.observe(_secs);
    }

    #[inline]
    pub fn observe_hydration_latency(&self, _secs: f64) {
        #[cfg(feature = "metrics")]
        self.hydration_latency_seconds.observe(_secs);
    }

    #[inline]
    pub fn observe_sink_write_latency(&self, _secs: f64) {
        #[cfg(feature = "metrics")]
        self.sink_write_latency_seconds.observe(_secs);
    }

    #[cfg(feature = "metrics")]
    pub fn gather(&self) -> AppResult<String> {
        use prometheus::{Encoder, TextEncoder};
        let metric_families = self.registry.gather();
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    #[cfg(not(feature = "metrics"))]
    pub fn gather(&self) -> AppResult<String> {
        Ok(String::new())
    }
}
