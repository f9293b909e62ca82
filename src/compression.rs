//! Compressed inputs. A compressed file is inflated once when it is opened
//! and read to the end; offsets count decompressed bytes.

use crate::error::{Error, Result};
use bzip2::read::BzDecoder;
use flate2::read::{GzDecoder, ZlibDecoder};
use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// `gz`
    Gzip,
    /// `z`
    Zlib,
    /// `bz2`
    Bzip2,
}

impl Compression {
    /// Inflates a whole compressed file.
    pub(crate) fn decompress(self, compressed: &[u8]) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        match self {
            Compression::Gzip => GzDecoder::new(compressed).read_to_end(&mut data)?,
            Compression::Zlib => ZlibDecoder::new(compressed).read_to_end(&mut data)?,
            Compression::Bzip2 => BzDecoder::new(compressed).read_to_end(&mut data)?,
        };
        Ok(data)
    }
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "gz" => Ok(Compression::Gzip),
            "z" => Ok(Compression::Zlib),
            "bz2" => Ok(Compression::Bzip2),
            other => Err(Error::InvalidConfig {
                message: format!("unsupported compression format: {other} (expected gz, z or bz2)"),
            }),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Compression::Gzip => "gz",
            Compression::Zlib => "z",
            Compression::Bzip2 => "bz2",
        };
        f.write_str(name)
    }
}
