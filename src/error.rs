//! Error types for the tailer.

use std::io;
use std::path::Path;
use thiserror::Error;

/// The main error type for tailer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors when opening, reading or stat'ing the tailed file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file to tail does not exist.
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// The file to tail exists but cannot be opened for reading.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    /// Poll intervals or encoding settings are unusable.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The file was truncated, deleted or rotated and could not be reopened
    /// within the retry budget.
    #[error("Failed to reopen {path}: {source}")]
    ReopenFailed {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The tailer was stopped while waiting for data.
    #[error("Tailer cancelled")]
    Cancelled,

    /// A line contained bytes that are malformed for the configured encoding.
    /// The line was consumed; `offset` is where reading resumes.
    #[error("Malformed input for configured encoding in line ending at offset {offset}")]
    Decode { offset: u64 },

    /// A compressed file has been read to the end. Compressed files are not
    /// followed, so nothing more will arrive.
    #[error("End of compressed input")]
    EndOfInput,

    /// The tailer has released its file handle.
    #[error("Tailer closed")]
    Closed,
}

impl Error {
    /// Maps an error from opening `path` onto the not-found and
    /// permission-denied variants, keeping everything else as I/O.
    pub(crate) fn from_open(err: io::Error, path: &Path) -> Self {
        let path = path.display().to_string();
        match err.kind() {
            io::ErrorKind::NotFound => Error::FileNotFound { path },
            io::ErrorKind::PermissionDenied => Error::PermissionDenied { path },
            _ => Error::Io(err),
        }
    }

    /// True when the error is the result of [`Tailer::stop`](crate::Tailer::stop).
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// A convenient Result type for tailer operations.
pub type Result<T> = std::result::Result<T, Error>;
