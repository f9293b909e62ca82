//! A polling file tailer for log collection.
//!
//! A [`Tailer`] reads newline-terminated lines from a file as they are
//! written and keeps going when the file is truncated, rotated, or deleted
//! and recreated. Every [`Line`] carries the byte offset right after it,
//! which is the position to persist in order to resume later.
//!
//! Changes are detected by polling file metadata; no filesystem
//! notification API is used. Compressed files (gzip, zlib, bzip2) are
//! read once to the end instead of being followed.
//!
//! # Example
//!
//! ```rust,no_run
//! use log_tailer::{Config, Tailer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tailer = Tailer::new(Config::new("app.log")).await?;
//!
//!     loop {
//!         let line = tailer.next_line().await?;
//!         println!("{} (resume at {})", line.text, line.byte_offset);
//!     }
//! }
//! ```

// Internal modules - not part of public API
mod backoff;
mod compression;
mod config;
mod decoder;
mod error;
mod file_id;
mod platform;
mod reader;
mod stream;
mod tailer;
mod watcher;

#[cfg(test)]
mod test_helpers;

// Public API exports
pub use compression::Compression;
pub use config::{Config, DEFAULT_POLL_INTERVAL, DEFAULT_REOPEN_RETRIES, WatcherConfig};
pub use error::{Error, Result};
pub use file_id::FileId;
pub use stream::LineStream;
pub use tailer::{Line, Tailer};

/// Opens a file for tailing and returns its lines as a stream.
///
/// # Example
///
/// ```rust,no_run
/// use log_tailer::{Config, tail_file};
/// use tokio_stream::StreamExt;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut lines = tail_file(Config::new("app.log").with_offset(0)).await?;
///
///     while let Some(line) = lines.next().await {
///         println!("{}", line?.text);
///     }
///
///     Ok(())
/// }
/// ```
pub async fn tail_file(config: Config) -> Result<LineStream> {
    Ok(Tailer::new(config).await?.into_stream())
}
