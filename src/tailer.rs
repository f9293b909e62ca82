//! The tailer: reads lines from a file as it grows and follows it across
//! truncation, rotation and deletion.

use crate::backoff::Backoff;
use crate::compression::Compression;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::file_id::FileId;
use crate::platform::{self, DeletePending, NativeProbe};
use crate::reader::{LineReader, RawLine};
use crate::stream::LineStream;
use crate::watcher::{Event, Watcher};
use encoding_rs::Encoding;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A line read from the tailed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Decoded text without the trailing `\n` or `\r\n`.
    pub text: String,
    /// Offset right after this line; reading resumes here. This is the
    /// value to checkpoint.
    pub byte_offset: u64,
    /// When the line was read.
    pub observed_at: SystemTime,
}

impl Line {
    fn new(raw: RawLine) -> Self {
        Self {
            text: raw.text,
            byte_offset: raw.offset,
            observed_at: SystemTime::now(),
        }
    }
}

struct State {
    reader: Option<LineReader>,
    /// Offset right after the last line handed out.
    last_offset: u64,
    /// The file was removed; finish reading the old handle before reopening.
    draining: bool,
    stopped: bool,
    /// A reopen ran out of retries.
    failed: bool,
}

/// Follows a single file, handing out one line per
/// [`next_line`](Tailer::next_line) call.
///
/// `next_line` calls are serialized; [`stop`](Tailer::stop) may be called
/// concurrently from another task (share the tailer through an `Arc`) and
/// makes a pending `next_line` return [`Error::Cancelled`].
pub struct Tailer {
    path: PathBuf,
    encoding: Option<&'static Encoding>,
    compression: Option<Compression>,
    reopen_retries: u32,
    watcher: Watcher,
    token: CancellationToken,
    state: Mutex<State>,
}

impl Tailer {
    /// Opens the file and positions it at `config.offset`.
    pub async fn new(config: Config) -> Result<Self> {
        Self::with_probe(config, Arc::new(NativeProbe)).await
    }

    /// Like [`new`](Self::new) with a custom delete-pending check.
    pub(crate) async fn with_probe(config: Config, probe: Arc<dyn DeletePending>) -> Result<Self> {
        let encoding = config.resolve_encoding()?;
        let file = platform::open_file(&config.path)
            .await
            .map_err(|e| Error::from_open(e, &config.path))?;
        if file.metadata().await?.is_dir() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a directory", config.path.display()),
            )));
        }

        let reader = open_reader(file, config.offset, encoding, config.compression).await?;
        let watcher = Watcher::new(&config.path, config.watcher)?.with_probe(probe);

        info!(
            path = %config.path.display(),
            offset = config.offset,
            encoding = encoding.map(|e| e.name()),
            compression = ?config.compression,
            "tailing file"
        );

        Ok(Self {
            path: config.path,
            encoding,
            compression: config.compression,
            reopen_retries: config.reopen_retries,
            watcher,
            token: CancellationToken::new(),
            state: Mutex::new(State {
                reader: Some(reader),
                last_offset: config.offset,
                draining: false,
                stopped: false,
                failed: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Waits for and returns the next complete line.
    ///
    /// Running out of data is never reported: the call keeps waiting until
    /// a line is available, the tailer is stopped or an unrecoverable error
    /// occurs.
    pub async fn next_line(&self) -> Result<Line> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if self.token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if state.stopped || state.failed {
            return Err(Error::Closed);
        }

        loop {
            let Some(reader) = state.reader.as_mut() else {
                // An earlier call was dropped in the middle of a reopen.
                self.reopen(state, false).await?;
                continue;
            };

            let line = match reader.read_line().await {
                Ok(Some(line)) => Ok(line),
                // A compressed file never grows: hand out what is left and stop.
                Ok(None) if self.compression.is_some() => match reader.take_partial() {
                    Some(line) => line,
                    None => return Err(Error::EndOfInput),
                },
                Ok(None) if state.draining => match reader.take_partial() {
                    Some(line) => line,
                    None => {
                        debug!(path = %self.path.display(), "old file drained, reopening");
                        self.reopen(state, false).await?;
                        continue;
                    }
                },
                Ok(None) => {
                    let partial = reader.has_partial();
                    self.wait(state, partial).await?;
                    continue;
                }
                Err(e) => Err(e),
            };

            return match line {
                Ok(line) => {
                    state.last_offset = line.offset;
                    Ok(Line::new(line))
                }
                Err(Error::Decode { offset }) => {
                    state.last_offset = offset;
                    Err(Error::Decode { offset })
                }
                Err(e) => Err(e),
            };
        }
    }

    /// Blocks until the watcher reports a change and reacts to it.
    async fn wait(&self, state: &mut State, partial: bool) -> Result<()> {
        let reader = state.reader.as_mut().ok_or(Error::Closed)?;
        let event = self
            .watcher
            .block_until_event(&self.token, reader.file(), reader.position())
            .await?;

        match event {
            Event::Modified => {
                if partial {
                    // Never hand out a line that was seen before it was complete.
                    reader.rewind(state.last_offset).await?;
                }
                Ok(())
            }
            Event::Truncated => {
                debug!(path = %self.path.display(), "file truncated, reopening");
                self.reopen(state, true).await
            }
            Event::Deleted => {
                let unread = reader
                    .len()
                    .await
                    .map(|len| len > reader.position())
                    .unwrap_or(false);
                if unread || reader.has_partial() {
                    debug!(path = %self.path.display(), "file removed, draining remaining lines");
                    state.draining = true;
                    return Ok(());
                }
                debug!(path = %self.path.display(), "file removed, reopening");
                self.reopen(state, false).await
            }
        }
    }

    /// Replaces the current handle with a fresh one for the same path and
    /// starts reading it from the beginning.
    ///
    /// Unless the file was truncated, a new handle that still refers to the
    /// old file is rejected: the path was recreated so quickly that the
    /// rename or unlink has not become visible yet.
    async fn reopen(&self, state: &mut State, truncated: bool) -> Result<()> {
        let mut previous = match state.reader.take() {
            Some(old) if !truncated => match FileId::of_file(old.file()).await {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "failed to stat old file; the same file may be reopened"
                    );
                    None
                }
            },
            _ => None,
        };
        state.draining = false;

        let interval = self.watcher.config().max_poll_interval;
        let mut backoff =
            Backoff::new(&self.token, interval, interval).with_max_retries(self.reopen_retries);
        let mut last_error = None;

        while backoff.ongoing() {
            let file = match platform::open_file(&self.path).await {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %self.path.display(), "waiting for file to appear");
                    self.watcher.block_until_exists(&self.token).await?;
                    // Whatever shows up now is a new file, even if the
                    // filesystem handed it the old inode.
                    previous = None;
                    continue;
                }
                Err(e) => {
                    debug!(path = %self.path.display(), error = %e, "failed to open file, retrying");
                    last_error = Some(e);
                    backoff.wait().await;
                    continue;
                }
            };

            match FileId::of_file(&file).await {
                Ok(id) if previous == Some(id) => {
                    last_error = Some(io::Error::other(format!(
                        "{} still refers to the file being replaced ({id})",
                        self.path.display()
                    )));
                }
                Ok(_) => {
                    state.reader = Some(open_reader(file, 0, self.encoding, self.compression).await?);
                    state.last_offset = 0;
                    debug!(path = %self.path.display(), truncated, "reopened file");
                    return Ok(());
                }
                Err(e) => {
                    debug!(path = %self.path.display(), error = %e, "failed to stat new file, retrying");
                    last_error = Some(e);
                }
            }
            backoff.wait().await;
        }

        if backoff.is_cancelled() {
            return Err(Error::Cancelled);
        }
        state.failed = true;
        Err(Error::ReopenFailed {
            path: self.path.display().to_string(),
            source: last_error.unwrap_or_else(|| io::Error::other("no reopen attempts allowed")),
        })
    }

    /// Cancels any pending wait and releases the file handle. A second call
    /// returns [`Error::Closed`].
    pub async fn stop(&self) -> Result<()> {
        self.token.cancel();
        let mut state = self.state.lock().await;
        if state.stopped {
            return Err(Error::Closed);
        }
        state.stopped = true;
        state.reader = None;
        debug!(path = %self.path.display(), "tailer stopped");
        Ok(())
    }

    /// Fires the cancellation token without waiting for the lock.
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Offset right after the last line returned.
    pub async fn offset(&self) -> u64 {
        self.state.lock().await.last_offset
    }

    /// Current size of the open file in bytes.
    pub async fn size(&self) -> Result<u64> {
        let state = self.state.lock().await;
        let reader = state.reader.as_ref().ok_or(Error::Closed)?;
        Ok(reader.len().await?)
    }

    /// Identity of the file currently being read.
    pub async fn file_id(&self) -> Result<FileId> {
        let state = self.state.lock().await;
        let reader = state.reader.as_ref().ok_or(Error::Closed)?;
        Ok(FileId::of_file(reader.file()).await?)
    }

    /// Turns the tailer into a stream of lines.
    pub fn into_stream(self) -> LineStream {
        LineStream::new(self)
    }
}

async fn open_reader(
    file: tokio::fs::File,
    offset: u64,
    encoding: Option<&'static Encoding>,
    compression: Option<Compression>,
) -> io::Result<LineReader> {
    match compression {
        Some(compression) => LineReader::open_compressed(file, compression, offset, encoding).await,
        None => LineReader::open(file, offset, encoding).await,
    }
}
