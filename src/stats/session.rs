//! Per-session statistics.

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::transport::{options::DEFAULT_BLOCK_SIZE, Options, Request};

/// Snapshot of one finished session, successful or not.
#[derive(Debug, Clone)]
pub struct SessionStats {
    session_id: Uuid,
    peer: SocketAddr,
    server_addr: SocketAddr,
    file_path: String,
    error: Option<String>,
    duration: Duration,
    packets_sent: u64,
    packets_acked: u64,
    bytes_sent: u64,
    options: Options,
    blksize: u16,
    retransmits: u64,
}

impl SessionStats {
    /// Start counting for `request`. The clock starts now.
    pub fn builder(request: &Request) -> SessionStatsBuilder {
        SessionStatsBuilder::new(request)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Failure description, `None` for a successful session.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    pub fn packets_acked(&self) -> u64 {
        self.packets_acked
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn blksize(&self) -> u16 {
        self.blksize
    }

    pub fn retransmits(&self) -> u64 {
        self.retransmits
    }

    pub fn server_port(&self) -> u16 {
        self.server_addr.port()
    }

    pub fn client_port(&self) -> u16 {
        self.peer.port()
    }
}

/// Accumulates counters while a session runs.
#[derive(Debug)]
pub struct SessionStatsBuilder {
    stats: SessionStats,
    started: Instant,
    duration: Option<Duration>,
}

impl SessionStatsBuilder {
    fn new(request: &Request) -> Self {
        Self {
            stats: SessionStats {
                session_id: Uuid::new_v4(),
                peer: request.peer(),
                server_addr: request.server_addr(),
                file_path: request.path().to_string(),
                error: None,
                duration: Duration::ZERO,
                packets_sent: 0,
                packets_acked: 0,
                bytes_sent: 0,
                options: request.options().clone(),
                blksize: DEFAULT_BLOCK_SIZE,
                retransmits: 0,
            },
            started: Instant::now(),
            duration: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.stats.session_id
    }

    pub fn blksize(&mut self, blksize: u16) -> &mut Self {
        self.stats.blksize = blksize;
        self
    }

    /// Count one transmission of a packet carrying `bytes` of payload.
    pub fn packet_sent(&mut self, bytes: usize) -> &mut Self {
        self.stats.packets_sent += 1;
        self.stats.bytes_sent += bytes as u64;
        self
    }

    pub fn packet_acked(&mut self) -> &mut Self {
        self.stats.packets_acked += 1;
        self
    }

    /// Count a resend. Resends do not add to `bytes_sent`.
    pub fn retransmit(&mut self) -> &mut Self {
        self.stats.packets_sent += 1;
        self.stats.retransmits += 1;
        self
    }

    /// Mark the session failed. The first error wins.
    pub fn error(&mut self, error: impl fmt::Display) -> &mut Self {
        if self.stats.error.is_none() {
            self.stats.error = Some(error.to_string());
        }
        self
    }

    /// Override the measured duration, for runtimes that keep their own clock.
    pub fn duration(&mut self, duration: Duration) -> &mut Self {
        self.duration = Some(duration);
        self
    }

    pub fn finish(self) -> SessionStats {
        let mut stats = self.stats;
        stats.duration = self.duration.unwrap_or_else(|| self.started.elapsed());
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Request {
        Request::new(
            "192.168.1.1:1069".parse().unwrap(),
            "192.168.1.50:35457".parse().unwrap(),
            "boot/pxe.img",
            Options::new().with("blksize", "1428"),
        )
    }

    #[test]
    fn test_builder_counts() {
        let mut builder = SessionStats::builder(&request());
        builder
            .blksize(1428)
            .packet_sent(1428)
            .packet_acked()
            .retransmit()
            .packet_sent(100)
            .packet_acked();
        let stats = builder.finish();

        assert_eq!(stats.packets_sent(), 3);
        assert_eq!(stats.packets_acked(), 2);
        assert_eq!(stats.retransmits(), 1);
        assert_eq!(stats.bytes_sent(), 1528);
        assert_eq!(stats.blksize(), 1428);
        assert_eq!(stats.server_port(), 1069);
        assert_eq!(stats.client_port(), 35457);
        assert_eq!(stats.file_path(), "boot/pxe.img");
        assert_eq!(stats.options().get("blksize"), Some("1428"));
        assert!(stats.is_success());
    }

    #[test]
    fn test_first_error_wins() {
        let mut builder = SessionStats::builder(&request());
        builder.error("file not found").error("second");
        let stats = builder.finish();
        assert_eq!(stats.error(), Some("file not found"));
        assert!(!stats.is_success());
    }

    #[test]
    fn test_duration_override() {
        let mut builder = SessionStats::builder(&request());
        builder.duration(Duration::from_millis(1500));
        assert_eq!(builder.finish().duration(), Duration::from_millis(1500));
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionStats::builder(&request()).finish();
        let b = SessionStats::builder(&request()).finish();
        assert_ne!(a.session_id(), b.session_id());
    }
}
