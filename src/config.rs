//! Tailer and watcher configuration.

use crate::compression::Compression;
use crate::error::{Error, Result};
use encoding_rs::Encoding;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default poll interval used for both bounds of a zero [`WatcherConfig`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Default number of attempts made to reopen a truncated or deleted file.
pub const DEFAULT_REOPEN_RETRIES: u32 = 20;

/// Bounds for the watcher's adaptive polling cadence.
///
/// Polling starts at `min_poll_interval` and doubles after every unchanged
/// poll until it reaches `max_poll_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    pub min_poll_interval: Duration,
    pub max_poll_interval: Duration,
}

impl WatcherConfig {
    pub const fn new(min_poll_interval: Duration, max_poll_interval: Duration) -> Self {
        Self {
            min_poll_interval,
            max_poll_interval,
        }
    }

    /// Both bounds set to the same interval.
    pub const fn fixed(interval: Duration) -> Self {
        Self::new(interval, interval)
    }

    fn is_zero(&self) -> bool {
        self.min_poll_interval.is_zero() && self.max_poll_interval.is_zero()
    }

    /// Checks that both intervals are non-zero and `max >= min`.
    pub fn validate(&self) -> Result<()> {
        if self.min_poll_interval.is_zero() {
            return Err(invalid("min_poll_interval must be greater than zero"));
        }
        if self.max_poll_interval.is_zero() {
            return Err(invalid("max_poll_interval must be greater than zero"));
        }
        if self.max_poll_interval < self.min_poll_interval {
            return Err(invalid(format!(
                "max_poll_interval ({:?}) must not be smaller than min_poll_interval ({:?})",
                self.max_poll_interval, self.min_poll_interval
            )));
        }
        Ok(())
    }

    /// Replaces the zero value with the defaults, then validates.
    pub(crate) fn normalized(self) -> Result<Self> {
        let config = if self.is_zero() { Self::default() } else { self };
        config.validate()?;
        Ok(config)
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self::fixed(DEFAULT_POLL_INTERVAL)
    }
}

/// Everything needed to construct a [`Tailer`](crate::Tailer).
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the file to tail.
    pub path: PathBuf,
    /// Byte offset to start reading from, usually a previously returned
    /// [`Line::byte_offset`](crate::Line::byte_offset).
    pub offset: u64,
    /// WHATWG encoding label such as `"UTF-16LE"`. `None` reads raw UTF-8.
    pub encoding: Option<String>,
    pub watcher: WatcherConfig,
    /// Compression format of the file. Compressed files are read once to
    /// the end instead of being followed.
    pub compression: Option<Compression>,
    /// Attempts made to obtain a new handle after truncation or deletion.
    pub reopen_retries: u32,
}

impl Config {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            offset: 0,
            encoding: None,
            watcher: WatcherConfig::default(),
            compression: None,
            reopen_retries: DEFAULT_REOPEN_RETRIES,
        }
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_encoding<S: Into<String>>(mut self, label: S) -> Self {
        self.encoding = Some(label.into());
        self
    }

    pub fn with_watcher(mut self, watcher: WatcherConfig) -> Self {
        self.watcher = watcher;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn with_reopen_retries(mut self, retries: u32) -> Self {
        self.reopen_retries = retries;
        self
    }

    /// Resolves the configured label, if any.
    pub(crate) fn resolve_encoding(&self) -> Result<Option<&'static Encoding>> {
        match &self.encoding {
            None => Ok(None),
            Some(label) => Encoding::for_label(label.trim().as_bytes())
                .map(Some)
                .ok_or_else(|| invalid(format!("unknown encoding label: {label}"))),
        }
    }
}

fn invalid<S: Into<String>>(message: S) -> Error {
    Error::InvalidConfig {
        message: message.into(),
    }
}
