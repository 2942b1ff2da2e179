//! Filesystem backend.
//!
//! Requested paths are mapped under a canonical root. Anything that would
//! leave the root (parent components, absolute paths, symlinks pointing
//! outside) is refused before a file handle is opened.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::backend::error::{Result, SourceError};
use crate::backend::source::{RequestHandler, ResponseSource};

/// Response data read from a local file.
#[derive(Debug)]
pub struct FileSource {
    file: Option<File>,
    size: u64,
    path: PathBuf,
}

impl FileSource {
    /// Open `path` and capture its length. The length never changes afterwards,
    /// even if the file is modified while the session runs.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let display = path.display().to_string();

        let file = File::open(&path)
            .await
            .map_err(|e| SourceError::from_open(&display, e))?;
        let metadata = file
            .metadata()
            .await
            .map_err(|e| SourceError::from_open(&display, e))?;
        if !metadata.is_file() {
            return Err(SourceError::NotAFile(display));
        }

        Ok(Self {
            file: Some(file),
            size: metadata.len(),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResponseSource for FileSource {
    async fn read(&mut self, n: usize) -> Result<Bytes> {
        let file = self.file.as_mut().ok_or(SourceError::Closed)?;

        let mut buf = vec![0u8; n];
        let mut filled = 0;
        // A single read may come back short before end of file.
        while filled < n {
            let read = file.read(&mut buf[filled..]).await?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        buf.truncate(filled);
        Ok(Bytes::from(buf))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            tracing::trace!(path = %self.path.display(), "File source closed");
        }
    }
}

/// Handler for one request against the filesystem backend.
#[derive(Debug)]
pub struct FileHandler {
    root: Arc<Path>,
    path: String,
}

impl FileHandler {
    /// `root` must already be canonical.
    pub fn new(root: Arc<Path>, path: impl Into<String>) -> Self {
        Self {
            root,
            path: path.into(),
        }
    }
}

#[async_trait]
impl RequestHandler for FileHandler {
    async fn response_data(&self) -> Result<Box<dyn ResponseSource>> {
        let resolved = resolve(&self.root, &self.path).await?;
        tracing::debug!(path = %self.path, resolved = %resolved.display(), "Resolved file request");
        Ok(Box::new(FileSource::open(resolved).await?))
    }
}

/// Map a client path onto `root`, refusing anything that escapes it.
pub async fn resolve(root: &Path, requested: &str) -> Result<PathBuf> {
    let relative = Path::new(requested.trim_start_matches('/'));
    if relative.as_os_str().is_empty() {
        return Err(SourceError::NotAFile(requested.to_string()));
    }
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(SourceError::AccessDenied(requested.to_string()));
    }

    let canonical = tokio::fs::canonicalize(root.join(relative))
        .await
        .map_err(|e| SourceError::from_open(requested, e))?;
    if !canonical.starts_with(root) {
        return Err(SourceError::AccessDenied(requested.to_string()));
    }
    Ok(canonical)
}
