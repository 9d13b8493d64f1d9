//! TOML configuration loading and validation (component J, ambient).
//!
//! Mirrors the teacher's own `appconfig.rs`: every numeric knob that would
//! be nonsensical at zero is validated eagerly, and any failure is a fatal
//! `AppError::InvalidConfig` before any I/O happens (spec §7.7).

use std::fs;

use serde::Deserialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub hydration: HydrationConfig,
    #[serde(default)]
    pub source: SourceConfig,
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Recognized options from spec §6, mapped 1:1 onto TOML fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HydrationConfig {
    pub batch_size: usize,
    pub max_in_flight_batches: usize,
    pub client_bandwidth: usize,
    pub user_cache_size: usize,
    pub post_cache_size: usize,
    pub modulo: i64,
    pub shard: i64,
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_in_flight_batches: 100,
            client_bandwidth: 10,
            user_cache_size: 20_000,
            post_cache_size: 20_000,
            modulo: 0,
            shard: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub hosts: Vec<String>,
    pub wanted_collections: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            hosts: vec![
                "jetstream1.us-east.bsky.network".to_string(),
                "jetstream2.us-east.bsky.network".to_string(),
                "jetstream1.us-west.bsky.network".to_string(),
                "jetstream2.us-west.bsky.network".to_string(),
            ],
            wanted_collections: "app.bsky.feed.post".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    pub base_url: String,
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub db_dir: String,
    pub rotation_minutes: u64,
    pub object_store_bucket: String,
    pub redis_url: String,
    pub stream_key: String,
    pub stream_trim_maxlen: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            db_dir: "jetstream-messages".to_string(),
            rotation_minutes: 1,
            object_store_bucket: "graze-turbo-01".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            stream_key: "hydrated_jetstream".to_string(),
            stream_trim_maxlen: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub bind_addr: String,
    pub port: u16,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 5100,
            path: "/metrics".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn validate(cfg: &AppConfig) -> AppResult<()> {
    if cfg.hydration.batch_size == 0 {
        return Err(AppError::InvalidConfig(
            "hydration.batch_size must be > 0".into(),
        ));
    }
    if cfg.hydration.max_in_flight_batches == 0 {
        return Err(AppError::InvalidConfig(
            "hydration.max_in_flight_batches must be > 0".into(),
        ));
    }
    if cfg.hydration.client_bandwidth == 0 {
        return Err(AppError::InvalidConfig(
            "hydration.client_bandwidth must be > 0".into(),
        ));
    }
    if cfg.hydration.user_cache_size == 0 {
        return Err(AppError::InvalidConfig(
            "hydration.user_cache_size must be > 0".into(),
        ));
    }
    if cfg.hydration.post_cache_size == 0 {
        return Err(AppError::InvalidConfig(
            "hydration.post_cache_size must be > 0".into(),
        ));
    }
    if cfg.source.hosts.is_empty() {
        return Err(AppError::InvalidConfig("source.hosts must not be empty".into()));
    }
    if cfg.credentials.base_url.is_empty() {
        return Err(AppError::InvalidConfig(
            "credentials.base_url must not be empty".into(),
        ));
    }
    if cfg.sink.rotation_minutes == 0 {
        return Err(AppError::InvalidConfig(
            "sink.rotation_minutes must be > 0".into(),
        ));
    }
    if cfg.metrics.port == 0 {
        return Err(AppError::InvalidConfig("metrics.port must be > 0".into()));
    }
    Ok(())
}

pub fn load_app_config(path: &str) -> AppResult<AppConfig> {
    let contents = fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&contents)?;
    validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
        [credentials]
        base_url = "https://api.graze.social"
        secret = "shh"
        "#
    }

    #[test]
    fn defaults_fill_in_every_omitted_table() {
        let cfg: AppConfig = toml::from_str(minimal_toml()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.hydration.batch_size, 10);
        assert_eq!(cfg.hydration.max_in_flight_batches, 100);
        assert_eq!(cfg.sink.stream_trim_maxlen, 100);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let toml_str = format!("{}\n[hydration]\nbatch_size = 0\n", minimal_toml());
        let cfg: AppConfig = toml::from_str(&toml_str).unwrap();
        let err = validate(&cfg);
        assert!(matches!(err, Err(AppError::InvalidConfig(_))));
    }

    #[test]
    fn empty_source_hosts_is_rejected() {
        let toml_str = format!("{}\n[source]\nhosts = []\n", minimal_toml());
        let cfg: AppConfig = toml::from_str(&toml_str).unwrap();
        let err = validate(&cfg);
        assert!(matches!(err, Err(AppError::InvalidConfig(_))));
    }
}
