//! Character decoding for non UTF-8 files.
//!
//! Bytes are fed through the decoder one at a time so that a line boundary
//! found in the decoded text maps back to an exact byte offset in the file.

use encoding_rs::{Decoder, DecoderResult, Encoding};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, SeekFrom};

/// Longest byte-order mark recognised (UTF-8).
const MAX_BOM_LEN: usize = 3;

pub(crate) struct LineDecoder {
    encoding: &'static Encoding,
    decoder: Decoder,
    text: String,
    malformed: bool,
}

impl LineDecoder {
    /// A decoder positioned at the start of a file sniffs and drops a BOM,
    /// which may switch it to the encoding the BOM names. Anywhere else the
    /// encoding is taken as given.
    pub(crate) fn new(encoding: &'static Encoding, at_start: bool) -> Self {
        Self {
            encoding,
            decoder: new_decoder(encoding, at_start),
            text: String::new(),
            malformed: false,
        }
    }

    /// Decodes one byte. Returns true once the decoded line ends with `\n`.
    pub(crate) fn push(&mut self, byte: u8) -> bool {
        self.decode(&[byte], false);
        self.text.ends_with('\n')
    }

    /// Takes the current line. `None` if any of its bytes were malformed.
    pub(crate) fn take_line(&mut self) -> Option<String> {
        let text = std::mem::take(&mut self.text);
        if std::mem::replace(&mut self.malformed, false) {
            None
        } else {
            Some(text)
        }
    }

    /// Takes an unterminated trailing line, flushing any incomplete sequence.
    pub(crate) fn finish(&mut self) -> Option<String> {
        self.decode(&[], true);
        let line = self.take_line();
        self.decoder = new_decoder(self.effective_encoding(), false);
        line
    }

    pub(crate) fn reset(&mut self, at_start: bool) {
        self.decoder = new_decoder(self.effective_encoding(), at_start);
        self.text.clear();
        self.malformed = false;
    }

    /// The encoding in use, which differs from the configured one once a
    /// BOM has been sniffed.
    pub(crate) fn effective_encoding(&mut self) -> &'static Encoding {
        self.encoding = self.decoder.encoding();
        self.encoding
    }

    fn decode(&mut self, mut src: &[u8], last: bool) {
        loop {
            if let Some(needed) = self
                .decoder
                .max_utf8_buffer_length_without_replacement(src.len())
            {
                self.text.reserve(needed);
            }

            let (result, read) =
                self.decoder
                    .decode_to_string_without_replacement(src, &mut self.text, last);
            src = &src[read..];
            match result {
                DecoderResult::InputEmpty => return,
                DecoderResult::OutputFull => {}
                // Keep going: bytes after the malformed sequence still count.
                DecoderResult::Malformed(_, _) => self.malformed = true,
            }
        }
    }
}

fn new_decoder(encoding: &'static Encoding, at_start: bool) -> Decoder {
    if at_start {
        encoding.new_decoder()
    } else {
        encoding.new_decoder_without_bom_handling()
    }
}

/// Reads the start of `file` and returns the encoding named by its
/// byte-order mark together with the BOM length, falling back to
/// `configured` with a length of zero. Leaves the cursor at the start.
pub(crate) async fn sniff_bom<R>(
    file: &mut R,
    configured: &'static Encoding,
) -> io::Result<(&'static Encoding, usize)>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    file.seek(SeekFrom::Start(0)).await?;

    let mut head = [0u8; MAX_BOM_LEN];
    let mut filled = 0;
    while filled < head.len() {
        let n = file.read(&mut head[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    file.seek(SeekFrom::Start(0)).await?;

    Ok(Encoding::for_bom(&head[..filled]).unwrap_or((configured, 0)))
}
