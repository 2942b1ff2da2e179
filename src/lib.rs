//! TFTP gateway library.
//!
//! Response data and backend dispatch for a TFTP server that serves boot
//! files from a local directory or proxies them from an HTTP origin, plus the
//! session and server statistics recorded around every transfer.

pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod observability;
pub mod session;
pub mod stats;
pub mod transport;

pub use config::schema::GatewayConfig;
pub use error::{Error, Severity};
pub use gateway::Gateway;
pub use lifecycle::Shutdown;
