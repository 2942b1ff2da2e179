//! Error types for response sources.
//!
//! Every error here is local to a single session: the transport runtime turns
//! it into a TFTP error reply (or a failed session record) and keeps serving.

use thiserror::Error;

use crate::transport::ErrorCode;

/// Broad category of a source failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Raised while building the source; nothing has been streamed yet.
    Unavailable,
    /// Raised from `read` after streaming may have started.
    Interrupted,
}

/// Error type for response source construction and streaming.
#[derive(Debug, Error)]
pub enum SourceError {
    /// File does not exist under the root.
    #[error("file not found: {0}")]
    NotFound(String),

    /// Path escapes the root or the file is not readable.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Path resolves to a directory or special file.
    #[error("not a regular file: {0}")]
    NotAFile(String),

    /// Any other failure opening a local file.
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Origin answered with a non-success status.
    #[error("origin returned {status} for {url}")]
    UpstreamStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Origin could not be reached.
    #[error("request to {url} failed: {source}")]
    Upstream {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Origin response does not declare its length.
    #[error("origin response for {url} has no content-length")]
    MissingLength { url: String },

    /// Local read failed mid-transfer.
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    /// Origin stream failed mid-transfer.
    #[error("origin stream interrupted: {0}")]
    Stream(#[source] reqwest::Error),

    /// Origin stream ended before the declared length.
    #[error("origin stream ended after {received} of {declared} bytes")]
    Truncated { declared: u64, received: u64 },

    /// Origin stream delivered more than the declared length.
    #[error("origin stream exceeded declared length of {declared} bytes")]
    Overrun { declared: u64 },

    /// `read` called after `close`.
    #[error("response source already closed")]
    Closed,
}

impl SourceError {
    pub fn kind(&self) -> SourceErrorKind {
        match self {
            SourceError::NotFound(_)
            | SourceError::AccessDenied(_)
            | SourceError::NotAFile(_)
            | SourceError::Open { .. }
            | SourceError::UpstreamStatus { .. }
            | SourceError::Upstream { .. }
            | SourceError::MissingLength { .. } => SourceErrorKind::Unavailable,
            SourceError::Io(_)
            | SourceError::Stream(_)
            | SourceError::Truncated { .. }
            | SourceError::Overrun { .. }
            | SourceError::Closed => SourceErrorKind::Interrupted,
        }
    }

    /// Code for the TFTP error reply sent to the client.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            SourceError::NotFound(_) => ErrorCode::FileNotFound,
            SourceError::UpstreamStatus { status, .. } => match status.as_u16() {
                404 | 410 => ErrorCode::FileNotFound,
                401 | 403 => ErrorCode::AccessViolation,
                _ => ErrorCode::NotDefined,
            },
            SourceError::AccessDenied(_) | SourceError::NotAFile(_) => {
                ErrorCode::AccessViolation
            }
            _ => ErrorCode::NotDefined,
        }
    }

    /// Classify a local open failure.
    pub(crate) fn from_open(path: &str, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => SourceError::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => SourceError::AccessDenied(path.to_string()),
            _ => SourceError::Open {
                path: path.to_string(),
                source,
            },
        }
    }
}

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;
