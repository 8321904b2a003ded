//! PasteService — submission policy on top of a [`PasteBackend`].
//!
//! Handlers never talk to the backend directly. This layer truncates bodies to
//! the configured maximum, stamps the submission date, flattens title and
//! language to single lines so the metadata record round-trips, and builds
//! public links.

use crate::{
    config::AppConfig,
    models::paste::Paste,
    storage::{PasteBackend, StoreResult},
};
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct PasteService {
    backend: Arc<dyn PasteBackend>,
    config: Arc<AppConfig>,
}

impl PasteService {
    pub fn new(backend: Arc<dyn PasteBackend>, config: AppConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Store a new paste, returning its name.
    pub async fn submit(&self, title: &str, language: &str, content: Bytes) -> StoreResult<String> {
        let content = if content.len() > self.config.max_size {
            content.slice(..self.config.max_size)
        } else {
            content
        };
        let paste = Paste::new(
            single_line(title),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            single_line(language),
            content,
        );

        let name = self.backend.put(&paste).await?;
        info!(%name, size = paste.content.len(), "stored new paste");
        Ok(name)
    }

    pub async fn fetch(&self, name: &str) -> StoreResult<Paste> {
        self.backend.get(name).await
    }

    pub async fn flush(&self) -> StoreResult<()> {
        self.backend.flush().await
    }

    /// Public URL of the paste called `name`.
    pub fn link(&self, name: &str) -> String {
        format!("{}/{}", self.config.server_prefix, name)
    }
}

/// Join the non-blank lines of `value`, each trimmed, with single spaces.
fn single_line(value: &str) -> String {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
