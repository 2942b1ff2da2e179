//! Session driving.
//!
//! # Data Flow
//! ```text
//! serve(gateway, request, sink) / serve_until(..., cancel)
//!     → ServerStats: process_count += 1
//!     → Gateway::open() ── error ──→ error reply + failed SessionStats
//!     → transfer::stream()
//!         → OACK of supported options (tsize = source.size())
//!         → read(blksize) → send_block() → ... → short final block
//!         → source.close()
//!     → cancel resolved first: error reply + interrupted SessionStats
//!     → SessionStats → StatsSink
//! ```
//!
//! # Design Decisions
//! - One task per session; the source is never shared
//! - The sink abstracts the wire so the same driver serves UDP and local output
//! - Stats are reported exactly once per session, whatever the outcome

pub mod sink;
pub mod transfer;

use std::future::Future;
use std::io;

use thiserror::Error;
use tracing::Instrument;

use crate::backend::SourceError;
use crate::gateway::Gateway;
use crate::stats::{SessionStats, SessionStatsBuilder};
use crate::transport::{ErrorCode, Request};

pub use sink::{BlockSink, Delivery, WriterSink};

/// Why a started transfer did not complete.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The client side went away or could not be reached.
    #[error("delivery to client failed: {0}")]
    Sink(#[source] io::Error),

    /// The server stopped the session before it finished.
    #[error("session interrupted by shutdown")]
    Interrupted,
}

/// Run one complete session: open, stream, close, report.
pub async fn serve<S>(gateway: &Gateway, request: &Request, sink: &mut S) -> SessionStats
where
    S: BlockSink + ?Sized,
{
    serve_until(gateway, request, sink, std::future::pending()).await
}

/// Like [`serve`], but gives up when `cancel` resolves first. An interrupted
/// session still sends an error reply and reports its stats.
pub async fn serve_until<S, F>(
    gateway: &Gateway,
    request: &Request,
    sink: &mut S,
    cancel: F,
) -> SessionStats
where
    S: BlockSink + ?Sized,
    F: Future<Output = ()>,
{
    gateway.server_stats().record_worker_spawned();

    let mut stats = SessionStats::builder(request);
    let span = tracing::info_span!(
        "session",
        id = %stats.session_id(),
        peer = %request.peer(),
        path = %request.path()
    );

    async {
        let interrupted = tokio::select! {
            _ = run(gateway, request, sink, &mut stats) => false,
            _ = cancel => true,
        };
        if interrupted {
            let e = TransferError::Interrupted;
            tracing::info!(error = %e, "Session interrupted");
            if let Err(send_err) = sink.send_error(ErrorCode::NotDefined, &e.to_string()).await {
                tracing::debug!(error = %send_err, "Failed to send error reply");
            }
            stats.error(&e);
        }
    }
    .instrument(span)
    .await;

    let stats = stats.finish();
    gateway.finish(&stats);
    stats
}

async fn run<S>(gateway: &Gateway, request: &Request, sink: &mut S, stats: &mut SessionStatsBuilder)
where
    S: BlockSink + ?Sized,
{
    match gateway.open(request).await {
        Ok(source) => transfer::stream(request, source, sink, stats).await,
        Err(e) => {
            if let Err(send_err) = sink.send_error(e.error_code(), &e.to_string()).await {
                tracing::debug!(error = %send_err, "Failed to send error reply");
            }
            stats.error(&e);
        }
    }
}
