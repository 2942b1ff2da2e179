//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config (validated) → Logging → Metrics → Gateway (backend resolved)
//!
//! Shutdown (shutdown.rs):
//!     Signal received → trigger → background tasks drain and exit
//!
//! Signals (signals.rs):
//!     SIGINT (Ctrl+C) → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: logging first so every later failure is recorded
//! - Fail fast: any startup error is fatal and stops the process
//! - Stats reporter drains one last time on shutdown

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, Started};
