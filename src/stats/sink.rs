//! Projection of statistics into structured log records.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tracing::Dispatch;

use crate::observability::logging::Logging;
use crate::observability::metrics;
use crate::stats::server::PROCESS_COUNT;
use crate::stats::session::SessionStats;

/// Log target of every stats record, for filtering and routing.
pub const STATS_TARGET: &str = "tftp_gateway::stats";

/// Renders session and server statistics as log records.
#[derive(Clone)]
pub struct StatsSink {
    dispatch: Dispatch,
}

impl StatsSink {
    /// Emit through the dispatcher owned by `logging`.
    pub fn new(logging: &Logging) -> Self {
        Self::from_dispatch(logging.dispatch().clone())
    }

    pub fn from_dispatch(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// One record per finished session. Failed sessions are logged at WARN
    /// and carry `error`; successful ones have no `error` field.
    ///
    /// Free text is recorded as string values, which the text formatter
    /// quotes and escapes and the JSON formatter stores as-is.
    pub fn report_session(&self, stats: &SessionStats) {
        tracing::dispatcher::with_default(&self.dispatch, || {
            let peer = stats.peer().to_string();
            macro_rules! session_record {
                ($level:ident) => {
                    tracing::$level!(
                        target: STATS_TARGET,
                        session_id = %stats.session_id(),
                        peer = peer.as_str(),
                        file_path = stats.file_path(),
                        error = stats.error(),
                        duration_ms = stats.duration().as_millis() as u64,
                        pkts_sent = stats.packets_sent(),
                        pkts_acked = stats.packets_acked(),
                        bytes_sent = stats.bytes_sent(),
                        options = %stats.options(),
                        blksize = stats.blksize(),
                        retransmits = stats.retransmits(),
                        srv_port = stats.server_port(),
                        client_port = stats.client_port(),
                        "Session stats"
                    )
                };
            }
            if stats.is_success() {
                session_record!(info);
            } else {
                session_record!(warn);
            }
        });

        metrics::record_session(stats.is_success(), stats.bytes_sent(), stats.duration());
    }

    /// One record if `counters` holds a worker count; nothing otherwise.
    ///
    /// Returns whether a record was emitted.
    pub fn report_server(&self, counters: &HashMap<String, u64>, interval: Duration) -> bool {
        let Some(&count) = counters.get(PROCESS_COUNT) else {
            return false;
        };

        tracing::dispatcher::with_default(&self.dispatch, || {
            tracing::info!(
                target: STATS_TARGET,
                interval_secs = interval.as_secs(),
                process_count = count,
                "Number of spawned TFTP workers in the last {} seconds: {}",
                interval.as_secs(),
                count
            );
        });
        metrics::record_workers(count);
        true
    }
}

impl fmt::Debug for StatsSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsSink").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Options, Request};
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

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
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capturing_sink() -> (StatsSink, Captured) {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        (StatsSink::from_dispatch(Dispatch::new(subscriber)), captured)
    }

    fn stats(error: Option<&str>) -> SessionStats {
        let request = Request::new(
            "10.0.0.1:69".parse().unwrap(),
            "10.0.0.42:35457".parse().unwrap(),
            "boot/pxe.img",
            Options::new().with("blksize", "1428"),
        );
        let mut builder = SessionStats::builder(&request);
        builder
            .blksize(1428)
            .packet_sent(10)
            .packet_acked()
            .duration(Duration::from_millis(1250));
        if let Some(error) = error {
            builder.error(error);
        }
        builder.finish()
    }

    #[test]
    fn test_session_record_fields() {
        let (sink, captured) = capturing_sink();
        sink.report_session(&stats(None));

        let out = captured.text();
        assert!(out.contains("INFO"), "{out}");
        assert!(out.contains(r#"peer="10.0.0.42:35457""#), "{out}");
        assert!(out.contains(r#"file_path="boot/pxe.img""#), "{out}");
        assert!(!out.contains("error="), "{out}");
        assert!(out.contains("duration_ms=1250"), "{out}");
        assert!(out.contains("pkts_sent=1"), "{out}");
        assert!(out.contains("pkts_acked=1"), "{out}");
        assert!(out.contains("bytes_sent=10"), "{out}");
        assert!(out.contains("blksize=1428"), "{out}");
        assert!(out.contains("retransmits=0"), "{out}");
        assert!(out.contains("srv_port=69"), "{out}");
        assert!(out.contains("client_port=35457"), "{out}");
        assert!(out.contains("options={blksize: 1428}"), "{out}");
    }

    #[test]
    fn test_failed_session_is_warn_with_escaped_error() {
        let (sink, captured) = capturing_sink();
        sink.report_session(&stats(Some("origin said \"no\"")));

        let out = captured.text();
        assert!(out.contains("WARN"), "{out}");
        assert!(out.contains(r#"error="origin said \"no\"""#), "{out}");
    }

    #[test]
    fn test_server_record_requires_process_count() {
        let (sink, captured) = capturing_sink();
        let interval = Duration::from_secs(60);

        let mut counters = HashMap::new();
        counters.insert("unrelated".to_string(), 7);
        assert!(!sink.report_server(&counters, interval));
        assert!(!sink.report_server(&HashMap::new(), interval));
        assert!(captured.text().is_empty());

        counters.insert(PROCESS_COUNT.to_string(), 3);
        assert!(sink.report_server(&counters, interval));
        let out = captured.text();
        assert!(out.contains("Number of spawned TFTP workers in the last 60 seconds: 3"), "{out}");
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn test_json_record_is_not_double_quoted() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(move || writer.clone())
            .finish();
        let sink = StatsSink::from_dispatch(Dispatch::new(subscriber));

        sink.report_session(&stats(None));
        let out = captured.text();
        assert!(out.contains(r#""peer":"10.0.0.42:35457""#), "{out}");
        assert!(out.contains(r#""file_path":"boot/pxe.img""#), "{out}");
        assert!(!out.contains(r#""error""#), "{out}");
    }

    #[test]
    fn test_empty_error_message_still_marks_failure() {
        let (sink, captured) = capturing_sink();
        sink.report_session(&stats(Some("")));

        let out = captured.text();
        assert!(out.contains("WARN"), "{out}");
        assert!(out.contains(r#"error="""#), "{out}");
    }
}
