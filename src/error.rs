//! Top-level error type.
//!
//! Two categories matter to callers: configuration errors stop the server
//! before it accepts a request, session errors fail one transfer and nothing
//! else.

use thiserror::Error;

use crate::backend::SourceError;
use crate::config::ConfigError;
use crate::session::TransferError;

/// How far an error reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Stop the process.
    Fatal,
    /// Fail the current session, keep serving.
    Session,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// A session ran to the end but failed; the text is its recorded error.
    #[error("session failed: {0}")]
    Session(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn severity(&self) -> Severity {
        match self {
            Error::Config(_) | Error::Io(_) => Severity::Fatal,
            Error::Source(_) | Error::Transfer(_) | Error::Session(_) => Severity::Session,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
