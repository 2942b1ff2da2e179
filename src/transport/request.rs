//! Completed read request handed over by the transport runtime.

use std::net::{IpAddr, SocketAddr};

use crate::transport::Options;

/// A validated read request. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    server_addr: SocketAddr,
    peer: SocketAddr,
    path: String,
    options: Options,
}

impl Request {
    pub fn new(
        server_addr: SocketAddr,
        peer: SocketAddr,
        path: impl Into<String>,
        options: Options,
    ) -> Self {
        Self {
            server_addr,
            peer,
            path: path.into(),
            options,
        }
    }

    /// Local address of the transfer socket.
    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Client IP without the port, as forwarded to HTTP origins.
    pub fn peer_ip(&self) -> IpAddr {
        self.peer.ip()
    }

    /// Requested path exactly as the client sent it.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}
