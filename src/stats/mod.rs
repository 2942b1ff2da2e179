//! Session and server statistics.
//!
//! # Data Flow
//! ```text
//! per session (transport runtime):
//!     SessionStatsBuilder (counts packets while streaming)
//!         → SessionStats (immutable snapshot)
//!         → StatsSink::report_session → one structured log record
//!
//! per server:
//!     ServerStats counters (incremented by the transport runtime)
//!         → StatsReporter ticks every interval
//!         → get_and_reset_all_counters() (atomic drain)
//!         → StatsSink::report_server → one record if process_count present
//! ```
//!
//! # Design Decisions
//! - The sink is a stateless projection; it never holds counters
//! - Records go through an explicitly passed tracing dispatcher
//! - Metrics are recorded alongside logs when an exporter is installed

pub mod reporter;
pub mod server;
pub mod session;
pub mod sink;

pub use reporter::StatsReporter;
pub use server::{ServerStats, PROCESS_COUNT};
pub use session::{SessionStats, SessionStatsBuilder};
pub use sink::{StatsSink, STATS_TARGET};
