//! HTTP proxy backend.
//!
//! # Responsibilities
//! - Issue a streaming GET to `base + path` on behalf of the TFTP client
//! - Forward the client IP so the origin can apply its own policy
//! - Announce the origin's Content-Length as the transfer size
//! - Hold the origin to that length while streaming

use std::net::IpAddr;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::CONTENT_LENGTH;

use crate::backend::error::{Result, SourceError};
use crate::backend::source::{RequestHandler, ResponseSource};

/// Header carrying the original TFTP client address.
pub const FORWARDED_FOR: &str = "X-Forwarded-For";

/// Response data streamed from an HTTP origin.
#[derive(Debug)]
pub struct HttpSource {
    response: Option<reqwest::Response>,
    url: String,
    length: DeclaredLength,
    pending: BytesMut,
    eof: bool,
}

impl HttpSource {
    /// Send the request and validate the response head. No body bytes are consumed.
    pub async fn open(client: &reqwest::Client, url: String, peer_ip: IpAddr) -> Result<Self> {
        let response = client
            .get(&url)
            .header(FORWARDED_FOR, peer_ip.to_string())
            .send()
            .await
            .map_err(|source| SourceError::Upstream {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::UpstreamStatus { url, status });
        }
        tracing::debug!(url = %url, headers = ?response.headers(), "HTTP response headers");

        // The body has not been downloaded yet, so the declared length is all we have.
        let size = match response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            Some(size) => size,
            None => return Err(SourceError::MissingLength { url }),
        };

        Ok(Self {
            response: Some(response),
            url,
            length: DeclaredLength::new(size),
            pending: BytesMut::new(),
            eof: false,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Buffer at least `n` bytes, or everything left in the stream.
    async fn fill(&mut self, n: usize) -> Result<()> {
        let response = self.response.as_mut().ok_or(SourceError::Closed)?;

        while self.pending.len() < n && !self.eof {
            match response.chunk().await.map_err(SourceError::Stream)? {
                Some(chunk) => {
                    self.length.accept(chunk.len())?;
                    self.pending.extend_from_slice(&chunk);
                }
                None => {
                    self.eof = true;
                    self.length.finish()?;
                }
            }
        }
        Ok(())
    }
}

/// Holds the body to the length the origin announced.
#[derive(Debug, Clone, Copy)]
struct DeclaredLength {
    declared: u64,
    received: u64,
}

impl DeclaredLength {
    fn new(declared: u64) -> Self {
        Self {
            declared,
            received: 0,
        }
    }

    fn accept(&mut self, len: usize) -> Result<()> {
        self.received += len as u64;
        if self.received > self.declared {
            return Err(SourceError::Overrun {
                declared: self.declared,
            });
        }
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        if self.received < self.declared {
            return Err(SourceError::Truncated {
                declared: self.declared,
                received: self.received,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ResponseSource for HttpSource {
    async fn read(&mut self, n: usize) -> Result<Bytes> {
        match self.fill(n).await {
            Ok(()) => {
                let take = n.min(self.pending.len());
                Ok(self.pending.split_to(take).freeze())
            }
            Err(e) => {
                // Buffered bytes must not surface later as a short final block.
                self.response = None;
                self.pending.clear();
                Err(e)
            }
        }
    }

    fn size(&self) -> u64 {
        self.length.declared
    }

    fn close(&mut self) {
        if self.response.take().is_some() {
            self.pending.clear();
            tracing::trace!(url = %self.url, received = self.length.received, "HTTP source closed");
        }
    }
}

/// Handler for one request against the HTTP backend.
#[derive(Debug)]
pub struct HttpHandler {
    client: reqwest::Client,
    url: String,
    peer_ip: IpAddr,
}

impl HttpHandler {
    /// The URL is `base` and `path` concatenated as-is.
    pub fn new(client: reqwest::Client, base: &str, path: &str, peer_ip: IpAddr) -> Self {
        Self {
            client,
            url: format!("{}{}", base, path),
            peer_ip,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RequestHandler for HttpHandler {
    async fn response_data(&self) -> Result<Box<dyn ResponseSource>> {
        tracing::debug!(url = %self.url, client_ip = %self.peer_ip, "Proxying request to origin");
        let source = HttpSource::open(&self.client, self.url.clone(), self.peer_ip).await?;
        Ok(Box::new(source))
    }
}
