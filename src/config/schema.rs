//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the TFTP gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Where the transport runtime listens.
    pub listener: ListenerConfig,

    /// Data source for responses.
    pub backend: BackendConfig,

    /// Retry and timeout settings handed to the transport runtime.
    pub transfer: TransferConfig,

    /// HTTP origin client settings (http backend only).
    pub http: HttpClientConfig,

    /// Logging, stats and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// IP address to listen on.
    pub address: String,

    /// UDP port to listen on.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 69,
        }
    }
}

/// Backend selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend identifier: "file" or "http".
    pub kind: String,

    /// Prefix for requested paths: a directory (file) or a base URL (http).
    pub root: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: "file".to_string(),
            root: "/tftproot".to_string(),
        }
    }
}

/// Transfer settings consumed by the transport runtime.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Retransmissions of a block before the session is abandoned.
    pub retries: u32,

    /// Seconds to wait for an ACK before retransmitting.
    pub timeout_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            timeout_secs: 5,
        }
    }
}

/// HTTP origin client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Total request timeout in seconds, body included. Unset means no limit,
    /// since large boot images can stream slowly to lock-step clients.
    pub request_timeout_secs: Option<u64>,

    /// User-Agent sent to the origin.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            request_timeout_secs: None,
            user_agent: concat!("tftp-gateway/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Log file rotation period.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or an EnvFilter directive.
    pub log_level: String,

    /// Output format for stdout and the log file.
    pub log_format: LogFormat,

    /// Log file path. `None` logs to stdout only.
    pub log_file: Option<PathBuf>,

    /// How often the log file rolls over. Rotation is by time only; there is
    /// no size threshold.
    pub log_rotation: LogRotation,

    /// Rotated log files kept on disk. Together with `log_rotation` this
    /// bounds disk use: the oldest file is deleted once the count is exceeded.
    pub log_max_files: usize,

    /// Interval between server stats records, in seconds.
    pub stats_interval_secs: u64,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            log_file: Some(PathBuf::from("/var/log/tftp.log")),
            log_rotation: LogRotation::Daily,
            log_max_files: 7,
            stats_interval_secs: 60,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
