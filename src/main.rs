//! TFTP gateway (v1)
//!
//! Serves boot files to TFTP clients from a local directory or by proxying to
//! an HTTP origin.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌───────────────────────────────────────────────────┐
//!                          │                   TFTP GATEWAY                     │
//!                          │                                                    │
//!   RRQ (external          │  ┌──────────┐    ┌────────────┐    ┌───────────┐   │
//!   transport runtime) ────┼─▶│ Request  │───▶│ Dispatcher │───▶│  Handler  │   │
//!                          │  └──────────┘    └────────────┘    └─────┬─────┘   │
//!                          │                                          │         │
//!                          │                          ┌───────────────┴──────┐  │
//!                          │                          ▼                      ▼  │
//!                          │                   ┌────────────┐        ┌────────────┐
//!                          │                   │ FileSource │        │ HttpSource │──▶ HTTP origin
//!                          │                   └─────┬──────┘        └─────┬──────┘
//!                          │                         └──────────┬──────────┘  │
//!   DATA blocks            │                                    ▼             │
//!   ◀──────────────────────┼────────────── BlockSink ◀── session::serve      │
//!                          │                                    │             │
//!                          │                                    ▼             │
//!                          │                 SessionStats / ServerStats       │
//!                          │                        → StatsSink → logs        │
//!                          └───────────────────────────────────────────────────┘
//! ```
//!
//! # Commands
//! - `check`: validate configuration and resolve the backend
//! - `fetch <path>`: run one full session through the gateway into a local file

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::AsyncWrite;

use tftp_gateway::config::loader::parse_config;
use tftp_gateway::config::{validate_config, ConfigError, GatewayConfig};
use tftp_gateway::lifecycle::{self, signals, Shutdown};
use tftp_gateway::session::{self, WriterSink};
use tftp_gateway::transport::{Options, Request};
use tftp_gateway::{Error, Gateway};

#[derive(Parser)]
#[command(name = "tftp-gateway")]
#[command(about = "Serve TFTP boot files from a directory or an HTTP origin", long_about = None)]
struct Cli {
    /// Configuration file (TOML). Flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend to fetch files from (file or http)
    #[arg(short, long)]
    backend: Option<String>,

    /// Base where to fetch files from (directory or URL)
    #[arg(short, long)]
    root: Option<String>,

    /// IP address to listen on
    #[arg(short, long)]
    address: Option<String>,

    /// UDP port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Block retransmissions before a session is abandoned
    #[arg(long)]
    retries: Option<u32>,

    /// Seconds to wait for an ACK
    #[arg(long)]
    timeout: Option<u64>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Log file path
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log to stdout only
    #[arg(long, conflicts_with = "log_file")]
    no_log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration and resolve the backend
    Check,
    /// Serve one file through the gateway and write it locally
    Fetch {
        /// Requested path, as a TFTP client would send it
        path: String,

        /// Client address reported to the backend (and forwarded to HTTP origins)
        #[arg(long, default_value = "127.0.0.1:0")]
        peer: SocketAddr,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Negotiate this block size
        #[arg(long)]
        blksize: Option<u16>,

        /// Ask for the transfer size
        #[arg(long)]
        tsize: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let started = match lifecycle::start(&config, cli.debug) {
        Ok(started) => started,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Check => {
            tracing::info!(
                backend = started.gateway.backend_name(),
                root = %started.gateway.dispatcher().backend().location(),
                "Configuration OK"
            );
            Ok(())
        }
        Commands::Fetch {
            path,
            peer,
            output,
            blksize,
            tsize,
        } => {
            let mut options = Options::new();
            if let Some(blksize) = blksize {
                options = options.with("blksize", blksize.to_string());
            }
            if tsize {
                options = options.with("tsize", "0");
            }
            let ip = config
                .listener
                .address
                .parse()
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
            let request = Request::new(SocketAddr::new(ip, config.listener.port), peer, path, options);
            fetch(&started.gateway, request, output).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, severity = ?e.severity(), "Command failed");
            ExitCode::FAILURE
        }
    }
}

/// Read the config file if given, apply flag overrides, then validate.
fn load(cli: &Cli) -> Result<GatewayConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => parse_config(&std::fs::read_to_string(path)?)?,
        None => GatewayConfig::default(),
    };

    if let Some(backend) = &cli.backend {
        config.backend.kind = backend.clone();
    }
    if let Some(root) = &cli.root {
        config.backend.root = root.clone();
    }
    if let Some(address) = &cli.address {
        config.listener.address = address.clone();
    }
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    if let Some(retries) = cli.retries {
        config.transfer.retries = retries;
    }
    if let Some(timeout) = cli.timeout {
        config.transfer.timeout_secs = timeout;
    }
    if let Some(log_file) = &cli.log_file {
        config.observability.log_file = Some(log_file.clone());
    }
    if cli.no_log_file {
        config.observability.log_file = None;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Run one session into `output` while the stats reporter runs alongside.
async fn fetch(gateway: &Gateway, request: Request, output: Option<PathBuf>) -> Result<(), Error> {
    let shutdown = Shutdown::new();
    let reporter = tokio::spawn(gateway.reporter().run(shutdown.subscribe()));

    let writer: Box<dyn AsyncWrite + Unpin + Send> = match &output {
        Some(path) => Box::new(tokio::fs::File::create(path).await?),
        None => Box::new(tokio::io::stdout()),
    };
    let mut sink = WriterSink::new(writer);

    let stats = session::serve_until(gateway, &request, &mut sink, signals::shutdown_signal()).await;
    sink.flush().await?;

    shutdown.trigger();
    if let Err(e) = reporter.await {
        tracing::warn!(error = %e, "Stats reporter task failed");
    }

    match stats.error() {
        None => Ok(()),
        Some(error) => Err(Error::Session(error.to_string())),
    }
}
