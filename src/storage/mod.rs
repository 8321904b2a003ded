//! Paste storage backends.
//!
//! Backends implement [`PasteBackend`] and are picked at startup by the
//! `storage` configuration string. The filesystem store is the only one
//! shipped.

pub mod fs;
pub mod naming;

use crate::models::paste::Paste;
use async_trait::async_trait;
use std::{io, path::PathBuf, sync::Arc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no free name left for fingerprint `{fingerprint}`")]
    NameExhausted { fingerprint: String },
    #[error("failed to write paste `{name}`: {source}")]
    WriteFailure {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("paste `{name}` not found")]
    NotFound {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read paste `{name}`: {source}")]
    ReadFailure {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("`{0}` is not a valid paste name")]
    InvalidName(String),
    #[error("storage root `{}` is unavailable: {reason}", path.display())]
    RootUnavailable { path: PathBuf, reason: String },
    #[error("storage backend `{0}` is not supported")]
    UnsupportedBackend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Capability interface every paste backend provides.
///
/// Backends hold no per-request state and must tolerate any number of
/// concurrent callers.
#[async_trait]
pub trait PasteBackend: Send + Sync {
    /// Persist a paste and return the name it was stored under.
    async fn put(&self, paste: &Paste) -> StoreResult<String>;

    /// Load the paste stored under `name`.
    async fn get(&self, name: &str) -> StoreResult<Paste>;

    /// Lifecycle hook for buffered backends. No-op unless overridden.
    async fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Open the backend named by `kind` rooted at `root`.
pub async fn open_backend(
    kind: &str,
    root: impl Into<PathBuf>,
) -> StoreResult<Arc<dyn PasteBackend>> {
    match kind {
        "fs" => Ok(Arc::new(fs::FsStore::open(root).await?)),
        other => Err(StoreError::UnsupportedBackend(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn opens_filesystem_backend() {
        let dir = TempDir::new().unwrap();
        let backend = open_backend("fs", dir.path()).await.unwrap();

        let name = backend
            .put(&Paste::new("t", "d", "l", "body"))
            .await
            .unwrap();
        assert_eq!(&backend.get(&name).await.unwrap().content[..], b"body");
        backend.flush().await.unwrap();
    }

    #[tokio::test]
    async fn rejects_unknown_backend() {
        let dir = TempDir::new().unwrap();
        let err = open_backend("s3", dir.path()).await.err().unwrap();
        assert!(matches!(err, StoreError::UnsupportedBackend(kind) if kind == "s3"));
    }
}
