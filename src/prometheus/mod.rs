pub mod config;
pub mod server;

pub use config::PrometheusConfig;
pub use server::run_metrics_server;
