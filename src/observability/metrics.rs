//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tftp_sessions_total` (counter): finished sessions by outcome
//! - `tftp_bytes_sent_total` (counter): payload bytes delivered
//! - `tftp_session_duration_seconds` (histogram): session duration
//! - `tftp_workers_spawned_total` (counter): transfer workers, fed by the stats drain
//!
//! # Design Decisions
//! - Recording is a no-op until `init_metrics` installs the exporter
//! - Labels stay low-cardinality (no peer addresses or paths)

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::ConfigError;

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), ConfigError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| ConfigError::Metrics(e.to_string()))?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished session.
pub fn record_session(success: bool, bytes_sent: u64, duration: Duration) {
    let outcome = if success { "success" } else { "error" };
    metrics::counter!("tftp_sessions_total", "outcome" => outcome).increment(1);
    metrics::counter!("tftp_bytes_sent_total").increment(bytes_sent);
    metrics::histogram!("tftp_session_duration_seconds").record(duration.as_secs_f64());
}

/// Record workers spawned since the previous drain.
pub fn record_workers(count: u64) {
    metrics::counter!("tftp_workers_spawned_total").increment(count);
}
