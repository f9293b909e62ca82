//! Buffered line reading with exact byte offsets.

use crate::compression::Compression;
use crate::decoder::{LineDecoder, sniff_bom};
use crate::error::{Error, Result};
use encoding_rs::Encoding;
use memchr::memchr;
use std::io::{self, Cursor, Read};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// A complete line with its terminator stripped.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct RawLine {
    pub(crate) text: String,
    /// Byte position right after the line terminator.
    pub(crate) offset: u64,
}

/// Reads newline-terminated lines from an open file, tracking the file
/// offset of every byte handed out.
pub(crate) struct LineReader {
    file: File,
    /// Decompressed contents of a compressed file. Reads come from here
    /// instead of `file`.
    inflated: Option<Cursor<Vec<u8>>>,
    buf: Vec<u8>,
    pos: usize,
    /// File offset of `buf[pos]`: everything before it has been consumed.
    position: u64,
    /// Bytes consumed since the last line boundary.
    partial_len: u64,
    raw: Vec<u8>,
    decoder: Option<LineDecoder>,
}

impl LineReader {
    /// Wraps `file` and seeks to `offset`. With an encoding, a byte-order
    /// mark at the start of the file is honoured even when starting later.
    pub(crate) async fn open(
        file: File,
        offset: u64,
        encoding: Option<&'static Encoding>,
    ) -> io::Result<Self> {
        Self::build(file, None, offset, encoding).await
    }

    /// Inflates the whole of `file` and reads lines from the result.
    /// `offset` counts decompressed bytes.
    pub(crate) async fn open_compressed(
        mut file: File,
        compression: Compression,
        offset: u64,
        encoding: Option<&'static Encoding>,
    ) -> io::Result<Self> {
        let mut compressed = Vec::new();
        file.read_to_end(&mut compressed).await?;
        let data = compression.decompress(&compressed)?;
        Self::build(file, Some(Cursor::new(data)), offset, encoding).await
    }

    async fn build(
        mut file: File,
        mut inflated: Option<Cursor<Vec<u8>>>,
        offset: u64,
        encoding: Option<&'static Encoding>,
    ) -> io::Result<Self> {
        let decoder = match encoding {
            None => None,
            Some(configured) if offset == 0 => Some(LineDecoder::new(configured, true)),
            Some(configured) => {
                let (encoding, _) = match &mut inflated {
                    Some(data) => sniff_bom(data, configured).await?,
                    None => sniff_bom(&mut file, configured).await?,
                };
                Some(LineDecoder::new(encoding, false))
            }
        };

        let mut reader = Self {
            file,
            inflated,
            buf: Vec::with_capacity(READ_CHUNK_SIZE),
            pos: 0,
            position: offset,
            partial_len: 0,
            raw: Vec::new(),
            decoder,
        };
        if offset != 0 {
            reader.seek(offset).await?;
        }
        Ok(reader)
    }

    pub(crate) fn file(&self) -> &File {
        &self.file
    }

    /// Offset of the next byte to be consumed, including bytes of an
    /// unterminated line.
    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn has_partial(&self) -> bool {
        self.partial_len > 0
    }

    /// Current length of the open file, decompressed if it is compressed.
    pub(crate) async fn len(&self) -> io::Result<u64> {
        match &self.inflated {
            Some(data) => Ok(data.get_ref().len() as u64),
            None => Ok(self.file.metadata().await?.len()),
        }
    }

    /// Reads the next line, refilling the buffer from the file as needed.
    /// `None` means no complete line is available right now; check
    /// [`has_partial`](Self::has_partial) for consumed unterminated bytes.
    ///
    /// A line with malformed bytes for the configured encoding is consumed
    /// and reported as [`Error::Decode`] carrying the offset after it.
    pub(crate) async fn read_line(&mut self) -> Result<Option<RawLine>> {
        loop {
            if let Some(line) = self.scan() {
                return line.map(Some);
            }

            self.buf.clear();
            self.pos = 0;
            self.buf.resize(READ_CHUNK_SIZE, 0);
            let n = match self.fill().await {
                Ok(n) => n,
                Err(e) => {
                    self.buf.clear();
                    return Err(e.into());
                }
            };
            self.buf.truncate(n);

            if n == 0 {
                return Ok(None);
            }
        }
    }

    /// Consumes buffered bytes up to and including the next line terminator.
    /// Returns `None` when the buffer ran dry first.
    fn scan(&mut self) -> Option<Result<RawLine>> {
        let window = &self.buf[self.pos..];
        if window.is_empty() {
            return None;
        }

        let (consumed, text) = match &mut self.decoder {
            None => match memchr(b'\n', window) {
                Some(i) => {
                    self.raw.extend_from_slice(&window[..=i]);
                    let text = String::from_utf8_lossy(&self.raw).into_owned();
                    self.raw.clear();
                    (i + 1, Some(Some(text)))
                }
                None => {
                    self.raw.extend_from_slice(window);
                    (window.len(), None)
                }
            },
            Some(decoder) => match window.iter().position(|&byte| decoder.push(byte)) {
                Some(i) => (i + 1, Some(decoder.take_line())),
                None => (window.len(), None),
            },
        };

        self.pos += consumed;
        self.position += consumed as u64;
        self.partial_len += consumed as u64;
        text.map(|text| self.finish_line(text))
    }

    /// Closes the current line. `None` text means it failed to decode.
    fn finish_line(&mut self, text: Option<String>) -> Result<RawLine> {
        self.partial_len = 0;
        match text {
            Some(text) => Ok(RawLine {
                text: trim_line_ending(text),
                offset: self.position,
            }),
            None => Err(Error::Decode {
                offset: self.position,
            }),
        }
    }

    /// Hands out the consumed bytes of an unterminated line as a line of
    /// its own. Used when the file can no longer grow.
    pub(crate) fn take_partial(&mut self) -> Option<Result<RawLine>> {
        if !self.has_partial() {
            return None;
        }
        let text = match &mut self.decoder {
            None => {
                let text = String::from_utf8_lossy(&self.raw).into_owned();
                self.raw.clear();
                Some(text)
            }
            Some(decoder) => decoder.finish(),
        };
        Some(self.finish_line(text))
    }

    async fn fill(&mut self) -> io::Result<usize> {
        match &mut self.inflated {
            Some(data) => Read::read(data, &mut self.buf),
            None => self.file.read(&mut self.buf).await,
        }
    }

    async fn seek(&mut self, offset: u64) -> io::Result<()> {
        match &mut self.inflated {
            Some(data) => data.set_position(offset),
            None => {
                self.file.seek(SeekFrom::Start(offset)).await?;
            }
        }
        Ok(())
    }

    /// Moves the cursor back to `offset` and drops everything buffered.
    pub(crate) async fn rewind(&mut self, offset: u64) -> io::Result<()> {
        self.seek(offset).await?;
        self.buf.clear();
        self.pos = 0;
        self.position = offset;
        self.partial_len = 0;
        self.raw.clear();
        if let Some(decoder) = &mut self.decoder {
            decoder.reset(offset == 0);
        }
        Ok(())
    }
}

/// Strips a trailing `\n` and then an optional `\r`.
fn trim_line_ending(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}
