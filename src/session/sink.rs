//! Destination of streamed blocks.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::transport::{ErrorCode, Options};

/// Outcome of delivering one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Times the block went out before it was acknowledged (at least 1).
    pub transmissions: u32,
}

impl Delivery {
    pub fn first_try() -> Self {
        Self { transmissions: 1 }
    }
}

/// Where a session's blocks go. The UDP implementation (DATA/ACK lock-step,
/// retransmission on timeout) belongs to the transport runtime.
#[async_trait]
pub trait BlockSink: Send {
    /// Acknowledge the accepted options (OACK) before the first block.
    async fn negotiate(&mut self, _accepted: &Options) -> io::Result<()> {
        Ok(())
    }

    /// Deliver block `block` and wait until the client has it.
    async fn send_block(&mut self, block: u16, data: &[u8]) -> io::Result<Delivery>;

    /// Tell the client the transfer failed.
    async fn send_error(&mut self, code: ErrorCode, message: &str) -> io::Result<()>;
}

/// Sink writing block payloads to any async writer. Every block is delivered
/// on the first try.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
    accepted: Option<Options>,
    error: Option<(ErrorCode, String)>,
    blocks: u64,
}

impl<W: AsyncWrite + Unpin + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            accepted: None,
            error: None,
            blocks: 0,
        }
    }

    /// Options acknowledged for the session, if any were.
    pub fn accepted(&self) -> Option<&Options> {
        self.accepted.as_ref()
    }

    /// Error reply sent to the client, if any.
    pub fn error(&self) -> Option<(ErrorCode, &str)> {
        self.error.as_ref().map(|(code, msg)| (*code, msg.as_str()))
    }

    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    pub async fn flush(&mut self) -> io::Result<()> {
        self.writer.flush().await
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> BlockSink for WriterSink<W> {
    async fn negotiate(&mut self, accepted: &Options) -> io::Result<()> {
        self.accepted = Some(accepted.clone());
        Ok(())
    }

    async fn send_block(&mut self, _block: u16, data: &[u8]) -> io::Result<Delivery> {
        self.writer.write_all(data).await?;
        self.blocks += 1;
        Ok(Delivery::first_try())
    }

    async fn send_error(&mut self, code: ErrorCode, message: &str) -> io::Result<()> {
        self.error = Some((code, message.to_string()));
        Ok(())
    }
}
