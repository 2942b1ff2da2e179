//! Negotiated TFTP options (RFC 2347/2348/2349).
//!
//! The transport runtime parses and negotiates options on the wire; this type
//! only carries the outcome and offers typed accessors for the values the
//! gateway needs.

use std::collections::BTreeMap;
use std::fmt;

/// Default block size (RFC 1350).
pub const DEFAULT_BLOCK_SIZE: u16 = 512;

/// Smallest block size a client may negotiate (RFC 2348).
pub const MIN_BLOCK_SIZE: u16 = 8;

/// Largest block size a client may negotiate (RFC 2348).
pub const MAX_BLOCK_SIZE: u16 = 65464;

/// Option names are case-insensitive; keys are stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    values: BTreeMap<String, String>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.values.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Effective block size, clamped to the RFC 2348 range.
    ///
    /// Unparsable values fall back to the default, as a client that sent
    /// garbage never saw it acknowledged.
    pub fn blksize(&self) -> u16 {
        self.get("blksize")
            .and_then(|v| v.parse::<u32>().ok())
            .map(|b| b.clamp(MIN_BLOCK_SIZE as u32, MAX_BLOCK_SIZE as u32) as u16)
            .unwrap_or(DEFAULT_BLOCK_SIZE)
    }

    /// Whether the client asked for the transfer size (RFC 2349).
    pub fn tsize_requested(&self) -> bool {
        self.get("tsize").is_some()
    }

    /// Negotiated retransmission timeout in seconds.
    pub fn timeout(&self) -> Option<u8> {
        self.get("timeout").and_then(|v| v.parse().ok()).filter(|t| *t > 0)
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let values = iter
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
            .collect();
        Self { values }
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", k, v)?;
        }
        write!(f, "}}")
    }
}
