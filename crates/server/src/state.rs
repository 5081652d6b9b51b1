use crate::config::ServerConfig;
use crate::error::ServerResult;
use encoder::Encoder;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Loaded tokenizer + model, shared read-only across requests
    pub encoder: Arc<Encoder>,

    /// Prometheus recorder handle, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Create new server state. Loads the encoder eagerly: if the model
    /// cannot be loaded the server must not start serving.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let encoder = Arc::new(Encoder::load(config.encoder.clone())?);

        // The global recorder can only be installed once per process;
        // later instances (e.g. under test) just go without.
        let metrics = if config.metrics_enabled {
            PrometheusBuilder::new().install_recorder().ok()
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            encoder,
            metrics,
        })
    }
}

/// Server metadata for health checks
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
}
