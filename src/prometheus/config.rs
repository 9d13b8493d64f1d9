//! Bind configuration for the metrics HTTP server, derived from the
//! top-level `[metrics]` table in `AppConfig` (see `appconfig.rs`).

use crate::appconfig::MetricsConfig;

#[derive(Debug, Clone)]
pub struct PrometheusConfig {
    pub bind_addr: String,
    pub port: u16,
    pub metrics_path: String,
}

impl From<&MetricsConfig> for PrometheusConfig {
    fn from(cfg: &MetricsConfig) -> Self {
        Self {
            bind_addr: cfg.bind_addr.clone(),
            port: cfg.port,
            metrics_path: cfg.path.clone(),
        }
    }
}
