//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize logging from the validated configuration
//! - Install the metrics exporter when enabled
//! - Resolve the backend into a gateway
//!
//! # Design Decisions
//! - Subsystems initialize in order, not concurrently
//! - Any error here is a configuration error and fatal

use std::net::SocketAddr;

use crate::config::{ConfigError, GatewayConfig};
use crate::gateway::Gateway;
use crate::observability::{metrics, Logging};
use crate::stats::StatsSink;

/// Initialized subsystems. Keep `logging` alive for the process lifetime.
pub struct Started {
    pub logging: Logging,
    pub gateway: Gateway,
}

/// Bring up logging, metrics and the gateway. Must run inside a tokio runtime.
pub fn start(config: &GatewayConfig, debug: bool) -> Result<Started, ConfigError> {
    let logging = Logging::init(&config.observability, debug)?;

    tracing::info!(
        backend = %config.backend.kind,
        root = %config.backend.root,
        address = %config.listener.address,
        port = config.listener.port,
        "Starting TFTP gateway with backend {} (on {}), listening on {}:{}",
        config.backend.kind,
        config.backend.root,
        config.listener.address,
        config.listener.port
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|e| ConfigError::Metrics(format!("{}", e)))?;
        metrics::init_metrics(addr)?;
    }

    let gateway = match Gateway::new(config, StatsSink::new(&logging)) {
        Ok(gateway) => gateway,
        Err(e) => {
            tracing::error!(error = %e, "Failed to resolve backend");
            return Err(e);
        }
    };

    Ok(Started { logging, gateway })
}
