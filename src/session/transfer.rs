//! Streaming a response source into a block sink.

use crate::backend::ResponseSource;
use crate::session::sink::BlockSink;
use crate::session::TransferError;
use crate::stats::SessionStatsBuilder;
use crate::transport::{Options, Request};

/// Stream `source` to `sink` in negotiated block sizes, counting into `stats`.
///
/// The source is always closed, whether the transfer completed or not. A
/// source failure is reported to the client with the matching error code.
pub async fn stream<S>(
    request: &Request,
    mut source: Box<dyn ResponseSource>,
    sink: &mut S,
    stats: &mut SessionStatsBuilder,
) where
    S: BlockSink + ?Sized,
{
    let blksize = request.options().blksize();
    stats.blksize(blksize);

    let result = pump(request, source.as_mut(), sink, stats, blksize).await;
    source.close();

    match result {
        Ok(()) => tracing::debug!("Transfer complete"),
        Err(e) => {
            tracing::warn!(error = %e, "Transfer failed");
            if let TransferError::Source(err) = &e {
                let code = err.error_code();
                if let Err(send_err) = sink.send_error(code, &err.to_string()).await {
                    tracing::debug!(error = %send_err, "Failed to send error reply");
                }
            }
            stats.error(&e);
        }
    }
}

async fn pump<S>(
    request: &Request,
    source: &mut dyn ResponseSource,
    sink: &mut S,
    stats: &mut SessionStatsBuilder,
    blksize: u16,
) -> Result<(), TransferError>
where
    S: BlockSink + ?Sized,
{
    let accepted = accepted_options(request.options(), blksize, source.size());
    if !accepted.is_empty() {
        sink.negotiate(&accepted).await.map_err(TransferError::Sink)?;
    }

    let block_size = blksize as usize;
    let mut block: u16 = 1;
    loop {
        let data = source.read(block_size).await?;
        let delivery = sink
            .send_block(block, &data)
            .await
            .map_err(TransferError::Sink)?;

        stats.packet_sent(data.len());
        for _ in 1..delivery.transmissions {
            stats.retransmit();
        }
        stats.packet_acked();

        // A short block, possibly empty, ends the transfer.
        if data.len() < block_size {
            return Ok(());
        }
        // Block numbers roll over on very large transfers.
        block = block.wrapping_add(1);
    }
}

/// Options to acknowledge: only the ones the client asked for and we support.
pub fn accepted_options(requested: &Options, blksize: u16, size: u64) -> Options {
    requested
        .iter()
        .filter_map(|(name, _)| match name {
            "blksize" => Some((name, blksize.to_string())),
            "tsize" => Some((name, size.to_string())),
            "timeout" => requested.timeout().map(|t| (name, t.to_string())),
            _ => None,
        })
        .collect()
}
