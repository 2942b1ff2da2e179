//! Transport runtime boundary.
//!
//! # Data Flow
//! ```text
//! UDP listener (external runtime)
//!     → parses RRQ + options
//!     → Request (immutable, this module)
//!     → Gateway::open() → ResponseSource
//!     → blocks streamed through a BlockSink
//!     → SessionStats handed back to the gateway
//! ```
//!
//! # Design Decisions
//! - Packet framing, retransmission and socket handling stay outside the crate
//! - Only the values that cross the boundary live here
//! - Error replies are expressed as RFC 1350 codes, never as encoded packets

pub mod error_code;
pub mod options;
pub mod request;

pub use error_code::ErrorCode;
pub use options::Options;
pub use request::Request;
