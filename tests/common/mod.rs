//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::Dispatch;

use tftp_gateway::backend::{Backend, Dispatcher};
use tftp_gateway::stats::StatsSink;
use tftp_gateway::transport::{Options, Request};
use tftp_gateway::Gateway;

/// What the mock origin answers with.
#[derive(Debug, Clone)]
pub struct OriginReply {
    pub status: u16,
    pub body: Vec<u8>,
    /// Content-Length header value. `None` omits the header.
    pub content_length: Option<usize>,
}

impl OriginReply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self {
            status: 200,
            content_length: Some(body.len()),
            body,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            content_length: Some(0),
        }
    }

    pub fn declared(mut self, content_length: Option<usize>) -> Self {
        self.content_length = content_length;
        self
    }
}

/// Start a mock HTTP origin on an ephemeral port.
///
/// The closure maps the request path to a reply. Every raw request head is
/// sent on the returned channel.
pub async fn start_origin<F>(f: F) -> (SocketAddr, mpsc::UnboundedReceiver<String>)
where
    F: Fn(&str) -> OriginReply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (heads_tx, heads_rx) = mpsc::unbounded_channel();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let heads_tx = heads_tx.clone();
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        let path = head
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("/")
                            .to_string();
                        let _ = heads_tx.send(head);

                        let reply = f(&path);
                        let status_text = match reply.status {
                            200 => "200 OK",
                            403 => "403 Forbidden",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let mut response = format!("HTTP/1.1 {}\r\nConnection: close\r\n", status_text);
                        if let Some(len) = reply.content_length {
                            response.push_str(&format!("Content-Length: {}\r\n", len));
                        }
                        response.push_str("\r\n");

                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.write_all(&reply.body).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, heads_rx)
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

/// Log writer collecting everything into memory.
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    /// Stats records only.
    pub fn stats_lines(&self) -> Vec<String> {
        self.text()
            .lines()
            .filter(|line| line.contains("tftp_gateway::stats"))
            .map(str::to_string)
            .collect()
    }
}

/// Stats sink whose records land in the returned buffer.
pub fn capturing_sink() -> (StatsSink, Captured) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    (StatsSink::from_dispatch(Dispatch::new(subscriber)), captured)
}

/// Gateway over `backend` with captured stats output.
pub fn gateway(backend: Backend) -> (Gateway, Captured) {
    let (sink, captured) = capturing_sink();
    let gateway = Gateway::from_parts(
        Dispatcher::from_backend(backend),
        sink,
        Duration::from_secs(60),
    );
    (gateway, captured)
}

/// Read request from `peer` for `path`, as the transport runtime would build it.
pub fn request(peer: &str, path: &str, options: Options) -> Request {
    Request::new(
        "127.0.0.1:69".parse().unwrap(),
        peer.parse().unwrap(),
        path,
        options,
    )
}
