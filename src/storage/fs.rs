//! FsStore — content-addressed paste storage on the local filesystem.
//!
//! Every paste `N` lives directly under the root as two files:
//!
//! ```text
//! {root}/
//! ├── c64cd33b555b3c22        # body, raw bytes
//! └── c64cd33b555b3c22.meta   # "Title: ..\nDate: ..\nLanguage: ..\n"
//! ```
//!
//! Names are claimed by creating the body and then the metadata file with
//! `create_new`, so two concurrent puts with the same fingerprint can never
//! both win a name, and an existing record of either kind is never replaced.
//! The store keeps no index; each call goes straight to the filesystem.

use super::{
    PasteBackend, StoreError, StoreResult,
    naming::{Fingerprint, is_valid_name},
};
use crate::models::paste::Paste;
use async_trait::async_trait;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::debug;

const META_EXTENSION: &str = "meta";

#[derive(Clone, Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store over an existing directory.
    ///
    /// The directory is never created here; a missing root or a root that is
    /// not a directory yields `RootUnavailable`.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        match fs::metadata(&root).await {
            Ok(meta) if meta.is_dir() => Ok(Self { root }),
            Ok(_) => Err(StoreError::RootUnavailable {
                path: root,
                reason: "not a directory".into(),
            }),
            Err(err) => Err(StoreError::RootUnavailable {
                reason: err.to_string(),
                path: root,
            }),
        }
    }

    fn body_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn meta_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{META_EXTENSION}"))
    }

    /// Walk the fingerprint windows and claim the first free name.
    ///
    /// A name is free only when neither its body nor its metadata record
    /// exists; both are claimed with `create_new`, body first.
    async fn reserve(&self, fingerprint: &Fingerprint) -> StoreResult<Reservation> {
        for name in fingerprint.candidates() {
            let body = match create_new(self.body_path(name)).await {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    debug!(name, "paste name taken, trying next window");
                    continue;
                }
                Err(err) => {
                    return Err(StoreError::WriteFailure {
                        name: name.to_string(),
                        source: err,
                    });
                }
            };

            match create_new(self.meta_path(name)).await {
                Ok(meta) => {
                    return Ok(Reservation {
                        name: name.to_string(),
                        body,
                        meta,
                    });
                }
                Err(err) => {
                    drop(body);
                    self.remove_partial(&self.body_path(name)).await;
                    if err.kind() != ErrorKind::AlreadyExists {
                        return Err(StoreError::WriteFailure {
                            name: name.to_string(),
                            source: err,
                        });
                    }
                    debug!(name, "metadata record already present, trying next window");
                }
            }
        }

        Err(StoreError::NameExhausted {
            fingerprint: fingerprint.as_str().to_string(),
        })
    }

    /// Fill both reserved records. On failure nothing is left under the name.
    async fn commit(&self, reservation: Reservation, paste: &Paste) -> StoreResult<String> {
        let Reservation { name, body, meta } = reservation;

        if let Err(err) = write_records(body, meta, paste).await {
            self.discard(&name).await;
            return Err(StoreError::WriteFailure { name, source: err });
        }

        debug!(%name, size = paste.content.len(), "stored paste");
        Ok(name)
    }

    /// Remove whatever a failed put left behind under `name`.
    async fn discard(&self, name: &str) {
        for path in [self.meta_path(name), self.body_path(name)] {
            self.remove_partial(&path).await;
        }
    }

    async fn remove_partial(&self, path: &Path) {
        match fs::remove_file(path).await {
            Ok(_) => debug!("removed partial record {}", path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => debug!(
                "failed to remove partial record {}: {}",
                path.display(),
                err
            ),
        }
    }
}

/// A claimed name whose body and metadata records exist but are still empty.
struct Reservation {
    name: String,
    body: File,
    meta: File,
}

async fn create_new(path: PathBuf) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
}

async fn write_records(mut body: File, mut meta: File, paste: &Paste) -> io::Result<()> {
    meta.write_all(paste.metadata_record().as_bytes()).await?;
    meta.flush().await?;
    meta.sync_all().await?;
    body.write_all(&paste.content).await?;
    body.flush().await?;
    body.sync_all().await?;
    Ok(())
}

#[async_trait]
impl PasteBackend for FsStore {
    async fn put(&self, paste: &Paste) -> StoreResult<String> {
        let fingerprint =
            Fingerprint::compute(&paste.title, &paste.date, &paste.language, &paste.content);
        let reservation = self.reserve(&fingerprint).await?;
        self.commit(reservation, paste).await
    }

    async fn get(&self, name: &str) -> StoreResult<Paste> {
        if !is_valid_name(name) {
            return Err(StoreError::InvalidName(name.to_string()));
        }

        let meta = fs::read(self.meta_path(name))
            .await
            .map_err(|err| read_error(name, err))?;
        let meta = String::from_utf8(meta).map_err(|err| StoreError::ReadFailure {
            name: name.to_string(),
            source: io::Error::new(ErrorKind::InvalidData, err),
        })?;
        let content = fs::read(self.body_path(name))
            .await
            .map_err(|err| read_error(name, err))?;

        Ok(Paste::from_records(&meta, content))
    }

    async fn flush(&self) -> StoreResult<()> {
        debug!("flush requested for {}, nothing buffered", self.root.display());
        Ok(())
    }
}

fn read_error(name: &str, err: io::Error) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        StoreError::NotFound {
            name: name.to_string(),
            source: err,
        }
    } else {
        StoreError::ReadFailure {
            name: name.to_string(),
            source: err,
        }
    }
}
