//! Backend dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! startup:
//!     BackendConfig { kind, root }
//!         → BackendKind::from_str (unknown kind = ConfigError, server never starts)
//!         → Backend::File { canonical root } | Backend::Http { base, client }
//!         → Dispatcher (held for the server lifetime)
//!
//! per request:
//!     Dispatcher::handler(&Request)
//!         → file.rs FileHandler | http.rs HttpHandler
//!         → RequestHandler::response_data()
//!         → Box<dyn ResponseSource> (size known, nothing streamed yet)
//! ```
//!
//! # Design Decisions
//! - The backend is resolved once into an enum; requests never branch on strings
//! - Handlers own cheap clones of what they need (Arc'd root, pooled client)
//! - Source construction fails before any byte reaches the client

pub mod error;
pub mod file;
pub mod http;
pub mod source;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::config::{BackendConfig, ConfigError, HttpClientConfig};
use crate::transport::Request;

pub use error::{SourceError, SourceErrorKind};
pub use file::{FileHandler, FileSource};
pub use http::{HttpHandler, HttpSource};
pub use source::{RequestHandler, ResponseSource};

/// Backend identifier from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Serve files from a local directory.
    File,
    /// Proxy requests to an HTTP origin.
    Http,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::File => "file",
            BackendKind::Http => "http",
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(BackendKind::File),
            "http" => Ok(BackendKind::Http),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved backend.
#[derive(Debug, Clone)]
pub enum Backend {
    File {
        /// Canonical root directory.
        root: Arc<Path>,
    },
    Http {
        /// Base URL, prefixed verbatim to requested paths.
        base: String,
        client: reqwest::Client,
    },
}

impl Backend {
    /// Resolve configuration into a backend, checking the root on the way.
    pub fn from_config(config: &BackendConfig, http: &HttpClientConfig) -> Result<Self, ConfigError> {
        match config.kind.parse::<BackendKind>()? {
            BackendKind::File => Self::file(&config.root),
            BackendKind::Http => Self::http(&config.root, build_client(http)?),
        }
    }

    /// Filesystem backend rooted at `root`, which must be an existing directory.
    pub fn file(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let root = root.as_ref();
        let invalid = |reason: String| ConfigError::InvalidRoot {
            root: root.display().to_string(),
            reason,
        };

        let canonical = std::fs::canonicalize(root).map_err(|e| invalid(e.to_string()))?;
        if !canonical.is_dir() {
            return Err(invalid("not a directory".to_string()));
        }
        Ok(Backend::File {
            root: canonical.into(),
        })
    }

    /// HTTP backend proxying to `base`, which must be an absolute http(s) URL.
    pub fn http(base: &str, client: reqwest::Client) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            base: base.to_string(),
            reason,
        };

        let url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
        }
        Ok(Backend::Http {
            base: base.to_string(),
            client,
        })
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::File { .. } => BackendKind::File,
            Backend::Http { .. } => BackendKind::Http,
        }
    }

    /// Root directory or base URL, for logging.
    pub fn location(&self) -> String {
        match self {
            Backend::File { root } => root.display().to_string(),
            Backend::Http { base, .. } => base.clone(),
        }
    }
}

/// Build the shared origin client. One pool serves every session.
pub fn build_client(config: &HttpClientConfig) -> Result<reqwest::Client, ConfigError> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .user_agent(config.user_agent.clone());
    if let Some(secs) = config.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().map_err(ConfigError::HttpClient)
}

/// Selects the handler for each incoming request.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    backend: Backend,
}

impl Dispatcher {
    /// Build from configuration. Fails on unknown backends and invalid roots.
    pub fn new(config: &BackendConfig, http: &HttpClientConfig) -> Result<Self, ConfigError> {
        let backend = Backend::from_config(config, http)?;
        tracing::info!(
            backend = %backend.kind(),
            root = %backend.location(),
            "Backend resolved"
        );
        Ok(Self { backend })
    }

    pub fn from_backend(backend: Backend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Construct the handler bound to `request`.
    pub fn handler(&self, request: &Request) -> Box<dyn RequestHandler> {
        match &self.backend {
            Backend::File { root } => Box::new(FileHandler::new(root.clone(), request.path())),
            Backend::Http { base, client } => Box::new(HttpHandler::new(
                client.clone(),
                base,
                request.path(),
                request.peer_ip(),
            )),
        }
    }
}
