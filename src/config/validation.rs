//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, intervals > 0)
//! - Check that addresses and filters parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Filesystem and network checks happen later, when the dispatcher is built

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::backend::BackendKind;
use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("backend.kind: unknown backend {0:?} (expected \"file\" or \"http\")")]
    UnknownBackend(String),

    #[error("backend.root: must not be empty")]
    EmptyRoot,

    #[error("listener.address: {0:?} is not an IP address")]
    InvalidAddress(String),

    #[error("transfer.timeout_secs: must be between 1 and 255, got {0}")]
    InvalidTimeout(u64),

    #[error("http.connect_timeout_secs: must be greater than 0")]
    InvalidConnectTimeout,

    #[error("observability.log_level: invalid filter {0:?}")]
    InvalidLogLevel(String),

    #[error("observability.log_max_files: must be at least 1")]
    InvalidMaxFiles,

    #[error("observability.stats_interval_secs: must be greater than 0")]
    InvalidStatsInterval,

    #[error("observability.metrics_address: {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check every semantic constraint, collecting all failures.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backend.kind.parse::<BackendKind>().is_err() {
        errors.push(ValidationError::UnknownBackend(config.backend.kind.clone()));
    }
    if config.backend.root.trim().is_empty() {
        errors.push(ValidationError::EmptyRoot);
    }

    if config.listener.address.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress(config.listener.address.clone()));
    }

    // The TFTP timeout option is a single octet (RFC 2349).
    if !(1..=255).contains(&config.transfer.timeout_secs) {
        errors.push(ValidationError::InvalidTimeout(config.transfer.timeout_secs));
    }

    if config.http.connect_timeout_secs == 0 {
        errors.push(ValidationError::InvalidConnectTimeout);
    }

    let observability = &config.observability;
    if EnvFilter::try_new(&observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(observability.log_level.clone()));
    }
    if observability.log_max_files == 0 {
        errors.push(ValidationError::InvalidMaxFiles);
    }
    if observability.stats_interval_secs == 0 {
        errors.push(ValidationError::InvalidStatsInterval);
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
