//! Structured logging.
//!
//! # Responsibilities
//! - Build the subscriber from configuration (level, format, file)
//! - Keep stdout free for data: console records go to stderr
//! - Own the non-blocking file writer for the process lifetime
//! - Hand the resulting dispatcher to components that emit records
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for machine parsing, text format for operators
//! - `RUST_LOG` takes precedence over the configured level
//! - Log files rotate on a schedule and keep a bounded number of files

use std::io::{self, IsTerminal};
use std::path::Path;

use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder as RollingBuilder, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::config::{ConfigError, LogFormat, LogRotation, ObservabilityConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// The process logging pipeline.
///
/// Dropping it flushes and stops the file writer, so it must live as long as
/// anything that logs.
pub struct Logging {
    dispatch: Dispatch,
    format: LogFormat,
    _guard: Option<WorkerGuard>,
}

impl Logging {
    /// Build the pipeline without installing it. Console output goes to stderr,
    /// coloured only when stderr is a terminal.
    pub fn build(config: &ObservabilityConfig, debug: bool) -> Result<Self, ConfigError> {
        let ansi = io::stderr().is_terminal();
        Self::with_console(config, debug, io::stderr, ansi)
    }

    /// Build the pipeline with an explicit console writer.
    pub fn with_console<W>(
        config: &ObservabilityConfig,
        debug: bool,
        console: W,
        ansi: bool,
    ) -> Result<Self, ConfigError>
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let level = if debug { "debug" } else { config.log_level.as_str() };
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .map_err(|e| ConfigError::Logging(e.to_string()))?;

        let mut layers: Vec<BoxedLayer> = vec![format_layer(config.log_format, console, ansi)];

        let guard = match &config.log_file {
            Some(path) => {
                let (writer, guard) = file_writer(path, config)?;
                layers.push(format_layer(config.log_format, writer, false));
                Some(guard)
            }
            None => None,
        };

        let subscriber = tracing_subscriber::registry().with(layers).with(filter);
        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            format: config.log_format,
            _guard: guard,
        })
    }

    /// Build the pipeline and make it the process-wide default.
    pub fn init(config: &ObservabilityConfig, debug: bool) -> Result<Self, ConfigError> {
        let logging = Self::build(config, debug)?;
        tracing::dispatcher::set_global_default(logging.dispatch.clone())
            .map_err(|e| ConfigError::Logging(e.to_string()))?;
        Ok(logging)
    }

    /// Wrap an existing dispatcher, e.g. a capturing subscriber in tests.
    pub fn from_dispatch(dispatch: Dispatch, format: LogFormat) -> Self {
        Self {
            dispatch,
            format,
            _guard: None,
        }
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Record format shared by the console and the log file.
    pub fn format(&self) -> LogFormat {
        self.format
    }
}

fn format_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer().with_writer(writer);
    match format {
        LogFormat::Text => layer.with_ansi(ansi).boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

fn file_writer(
    path: &Path,
    config: &ObservabilityConfig,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), ConfigError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ConfigError::Logging("log_file must include a file name".to_string()))?;

    let appender = RollingBuilder::new()
        .rotation(rotation(config.log_rotation))
        .filename_prefix(file_name)
        .max_log_files(config.log_max_files)
        .build(dir)
        .map_err(|e| ConfigError::Logging(format!("{}: {}", path.display(), e)))?;

    Ok(tracing_appender::non_blocking(appender))
}

fn rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Minutely => Rotation::MINUTELY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Never => Rotation::NEVER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdout_only() {
        let config = ObservabilityConfig {
            log_file: None,
            ..ObservabilityConfig::default()
        };
        let logging = Logging::build(&config, false).unwrap();
        tracing::dispatcher::with_default(logging.dispatch(), || {
            tracing::info!("stdout only");
        });
    }

    #[test]
    fn test_writes_log_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = ObservabilityConfig {
            log_file: Some(dir.path().join("tftp.log")),
            log_rotation: LogRotation::Never,
            log_format: LogFormat::Json,
            ..ObservabilityConfig::default()
        };

        let logging = Logging::build(&config, true).unwrap();
        tracing::dispatcher::with_default(logging.dispatch(), || {
            tracing::info!(target: "tftp_gateway::stats", peer = "10.0.0.42", "written to file");
        });
        drop(logging);

        let content = std::fs::read_to_string(dir.path().join("tftp.log")).unwrap();
        assert!(content.contains("written to file"), "{content}");
        assert!(content.contains("\"peer\":\"10.0.0.42\""), "{content}");
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_console_writer_without_ansi() {
        let config = ObservabilityConfig {
            log_file: None,
            ..ObservabilityConfig::default()
        };
        let captured = Captured::default();
        let writer = captured.clone();

        let logging = Logging::with_console(&config, false, move || writer.clone(), false).unwrap();
        assert_eq!(logging.format(), LogFormat::Text);
        tracing::dispatcher::with_default(logging.dispatch(), || {
            tracing::info!(peer = "10.0.0.42", "to the console");
        });

        let out = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("to the console"), "{out}");
        assert!(!out.contains('\u{1b}'), "{out:?}");
    }

    #[test]
    fn test_file_name_required() {
        let config = ObservabilityConfig {
            log_file: Some("/".into()),
            ..ObservabilityConfig::default()
        };
        assert!(matches!(
            Logging::build(&config, false),
            Err(ConfigError::Logging(_))
        ));
    }
}
