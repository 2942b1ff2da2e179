//! The two capabilities every backend provides.

use async_trait::async_trait;
use bytes::Bytes;

use crate::backend::error::Result;

/// Streamable, size-known response data bound to one request.
///
/// Reads are sequential: each call continues where the previous one stopped.
#[async_trait]
pub trait ResponseSource: Send {
    /// Read up to `n` bytes. Fewer than `n` only at end of stream; empty at end of stream.
    async fn read(&mut self, n: usize) -> Result<Bytes>;

    /// Total size announced to the client. Stable for the whole session.
    fn size(&self) -> u64;

    /// Release the underlying resource. Safe to call more than once.
    fn close(&mut self);
}

/// Produces the response data for one completed request.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Open the source. Fails before any byte is streamed.
    async fn response_data(&self) -> Result<Box<dyn ResponseSource>>;
}
