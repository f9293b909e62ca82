//! Polling change detection for a single file path.

use crate::backoff::Backoff;
use crate::config::WatcherConfig;
use crate::error::{Error, Result};
use crate::file_id::FileId;
use crate::platform::{self, DeletePending, NativeProbe};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::fs::File;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// What changed about the watched file since the reader ran dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    /// New bytes were appended or the file was rewritten in place.
    Modified,
    /// The file is now shorter than the reader's position.
    Truncated,
    /// The path no longer refers to the open file.
    Deleted,
}

/// Polls the metadata of one path with a backoff bounded by the configured
/// poll intervals.
pub(crate) struct Watcher {
    path: PathBuf,
    config: WatcherConfig,
    probe: Arc<dyn DeletePending>,
}

impl Watcher {
    pub(crate) fn new<P: AsRef<Path>>(path: P, config: WatcherConfig) -> Result<Self> {
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            config: config.normalized()?,
            probe: Arc::new(NativeProbe),
        })
    }

    /// Replaces the platform delete-pending check.
    pub(crate) fn with_probe(mut self, probe: Arc<dyn DeletePending>) -> Self {
        self.probe = probe;
        self
    }

    pub(crate) fn config(&self) -> &WatcherConfig {
        &self.config
    }

    fn backoff<'a>(&self, token: &'a CancellationToken) -> Backoff<'a> {
        Backoff::new(
            token,
            self.config.min_poll_interval,
            self.config.max_poll_interval,
        )
    }

    /// Waits until something exists at the watched path.
    pub(crate) async fn block_until_exists(&self, token: &CancellationToken) -> Result<()> {
        let mut backoff = self.backoff(token);
        loop {
            match tokio::fs::metadata(&self.path).await {
                Ok(_) => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound || platform::is_delete_in_progress(&e) => {}
                Err(e) => return Err(e.into()),
            }
            if !backoff.wait().await {
                return Err(Error::Cancelled);
            }
        }
    }

    /// Waits until the file behind `file` is modified, truncated below
    /// `position` or replaced at the watched path.
    pub(crate) async fn block_until_event(
        &self,
        token: &CancellationToken,
        file: &File,
        position: u64,
    ) -> Result<Event> {
        let origin = FileId::of_file(file).await?;
        let modified = file.metadata().await?.modified().ok();

        // An unchanged poll means size and mtime still equal the baseline,
        // so the baseline stays put for the whole wait.
        let mut backoff = self.backoff(token);
        loop {
            if let Some(event) = self.poll(file, origin, position, modified).await? {
                trace!(path = %self.path.display(), ?event, "file event");
                return Ok(event);
            }

            if !backoff.wait().await {
                return Err(Error::Cancelled);
            }
        }
    }

    /// One classification step. `None` means nothing changed.
    async fn poll(
        &self,
        file: &File,
        origin: FileId,
        prev_size: u64,
        prev_modified: Option<SystemTime>,
    ) -> Result<Option<Event>> {
        // An ambiguous handle state is treated as gone.
        match self.probe.is_delete_pending(file) {
            Ok(false) => {}
            Ok(true) | Err(_) => return Ok(Some(Event::Deleted)),
        }

        let (current, metadata) = match FileId::of_path(&self.path).await {
            Ok(found) => found,
            Err(e) if e.kind() == io::ErrorKind::NotFound || platform::is_delete_in_progress(&e) => {
                return Ok(Some(Event::Deleted));
            }
            Err(e) => return Err(e.into()),
        };

        if current != origin {
            return Ok(Some(Event::Deleted));
        }

        let size = metadata.len();
        if size < prev_size {
            return Ok(Some(Event::Truncated));
        }
        if size > prev_size || metadata.modified().ok() != prev_modified {
            return Ok(Some(Event::Modified));
        }
        Ok(None)
    }
}
