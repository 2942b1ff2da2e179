//! Periodic server stats reporting.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time;

use crate::stats::server::ServerStats;
use crate::stats::sink::StatsSink;

/// Background task draining server counters into the stats sink.
pub struct StatsReporter {
    stats: Arc<ServerStats>,
    sink: StatsSink,
}

impl StatsReporter {
    pub fn new(stats: Arc<ServerStats>, sink: StatsSink) -> Self {
        Self { stats, sink }
    }

    /// Drain every interval until shutdown, then drain one last time.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let interval = self.stats.interval();
        tracing::debug!(interval_secs = interval.as_secs(), "Stats reporter starting");

        let mut ticker = time::interval(interval);
        // The first tick completes immediately; there is nothing to report yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.drain();
                }
                _ = shutdown.recv() => {
                    self.drain();
                    tracing::debug!("Stats reporter received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Drain once. Returns whether a record was emitted.
    pub fn drain(&self) -> bool {
        let counters = self.stats.get_and_reset_all_counters();
        self.sink.report_server(&counters, self.stats.interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::server::PROCESS_COUNT;
    use std::time::Duration;
    use tracing::Dispatch;

    fn silent_sink() -> StatsSink {
        StatsSink::from_dispatch(Dispatch::none())
    }

    #[test]
    fn test_drain_reports_and_resets() {
        let stats = Arc::new(ServerStats::new(Duration::from_secs(60)));
        let reporter = StatsReporter::new(stats.clone(), silent_sink());

        assert!(!reporter.drain());
        stats.record_worker_spawned();
        assert!(reporter.drain());
        assert_eq!(stats.get(PROCESS_COUNT), 0);
        assert!(!reporter.drain());
    }

    #[tokio::test]
    async fn test_final_drain_on_shutdown() {
        let stats = Arc::new(ServerStats::new(Duration::from_secs(3600)));
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(StatsReporter::new(stats.clone(), silent_sink()).run(rx));

        stats.record_worker_spawned();
        stats.record_worker_spawned();
        tx.send(()).unwrap();
        handle.await.unwrap();

        assert_eq!(stats.get(PROCESS_COUNT), 0);
    }
}
