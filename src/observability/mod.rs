//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms, when enabled)
//!
//! Consumers:
//!     → stdout (text or JSON)
//!     → rotating log file (non-blocking writer)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Logging is configured once and handed around as a `Logging` value
//! - Stats records share the logging pipeline under their own target
//! - Metrics are cheap no-ops until an exporter is installed

pub mod logging;
pub mod metrics;

pub use logging::Logging;
