//! Gateway facade for the transport runtime.
//!
//! # Responsibilities
//! - Own the dispatcher, the stats sink and the server counters
//! - Turn a request into response data, logging unavailable sources
//! - Accept finished session stats
//! - Provide the periodic server stats reporter

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{Dispatcher, RequestHandler, ResponseSource, SourceError};
use crate::config::{ConfigError, GatewayConfig};
use crate::stats::{ServerStats, SessionStats, StatsReporter, StatsSink};
use crate::transport::Request;

/// Everything a transport runtime needs to serve requests.
#[derive(Debug)]
pub struct Gateway {
    dispatcher: Dispatcher,
    sink: StatsSink,
    server_stats: Arc<ServerStats>,
}

impl Gateway {
    /// Resolve the backend from configuration. Any error here is fatal.
    pub fn new(config: &GatewayConfig, sink: StatsSink) -> Result<Self, ConfigError> {
        let dispatcher = Dispatcher::new(&config.backend, &config.http)?;
        let interval = Duration::from_secs(config.observability.stats_interval_secs);
        Ok(Self::from_parts(dispatcher, sink, interval))
    }

    pub fn from_parts(dispatcher: Dispatcher, sink: StatsSink, stats_interval: Duration) -> Self {
        Self {
            dispatcher,
            sink,
            server_stats: Arc::new(ServerStats::new(stats_interval)),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Configured backend identifier, `"file"` or `"http"`.
    pub fn backend_name(&self) -> &'static str {
        self.dispatcher.backend().kind().as_str()
    }

    pub fn handler(&self, request: &Request) -> Box<dyn RequestHandler> {
        self.dispatcher.handler(request)
    }

    /// Produce the response data for `request`. Nothing is streamed on failure.
    pub async fn open(&self, request: &Request) -> Result<Box<dyn ResponseSource>, SourceError> {
        match self.handler(request).response_data().await {
            Ok(source) => {
                tracing::debug!(
                    peer = %request.peer(),
                    path = %request.path(),
                    size = source.size(),
                    "Response data ready"
                );
                Ok(source)
            }
            Err(e) => {
                tracing::warn!(
                    peer = %request.peer(),
                    path = %request.path(),
                    error = %e,
                    code = %e.error_code(),
                    "Response data unavailable"
                );
                Err(e)
            }
        }
    }

    /// Report a finished session.
    pub fn finish(&self, stats: &SessionStats) {
        self.sink.report_session(stats);
    }

    /// Counters shared with the transport runtime.
    pub fn server_stats(&self) -> Arc<ServerStats> {
        self.server_stats.clone()
    }

    pub fn sink(&self) -> &StatsSink {
        &self.sink
    }

    /// Reporter draining this gateway's server counters.
    pub fn reporter(&self) -> StatsReporter {
        StatsReporter::new(self.server_stats.clone(), self.sink.clone())
    }
}
