//! Test utilities for creating temporary log files and mutating them the way
//! writers and log rotators do.

use crate::compression::Compression;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub struct TempLogFile {
    pub path: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TempLogFile {
    /// Create a new, empty temporary log file
    pub fn new() -> io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("test.log");
        File::create(&path)?;

        Ok(Self {
            path,
            _temp_dir: temp_dir,
        })
    }

    /// Create a temporary log file with exactly `content`
    pub fn with_content(content: &str) -> io::Result<Self> {
        Self::with_bytes(content.as_bytes())
    }

    pub fn with_bytes(content: &[u8]) -> io::Result<Self> {
        let temp_file = Self::new()?;
        temp_file.append_bytes(content)?;
        Ok(temp_file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append content without adding a newline
    pub fn append(&self, content: &str) -> io::Result<()> {
        append_to(&self.path, content)
    }

    pub fn append_bytes(&self, content: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(content)?;
        file.flush()
    }

    /// Truncate in place and write new content, keeping the inode
    pub fn truncate_with(&self, content: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        file.write_all(content.as_bytes())?;
        file.flush()
    }

    pub fn remove(&self) -> io::Result<()> {
        fs::remove_file(&self.path)
    }

    /// Create the file again after it was removed
    pub fn recreate(&self, content: &str) -> io::Result<()> {
        fs::write(&self.path, content)
    }

    /// Move the current file aside to `<name>.1` and start a new one
    pub fn rotate(&self, content: &str) -> io::Result<()> {
        fs::rename(&self.path, self.path.with_extension("log.1"))?;
        self.recreate(content)
    }

    /// Replace the file by renaming a fully written sibling over it
    pub fn atomic_replace(&self, content: &str) -> io::Result<()> {
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, content)?;
        fs::rename(&staging, &self.path)
    }
}

pub fn append_to(path: &Path, content: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    file.write_all(content.as_bytes())?;
    file.flush()
}

pub fn utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

pub fn utf16be(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

/// Compress `content` the way a log rotator archives a file
pub fn compress(format: Compression, content: &[u8]) -> Vec<u8> {
    fn written<W: Write>(mut writer: W, content: &[u8]) -> W {
        writer.write_all(content).unwrap();
        writer
    }

    match format {
        Compression::Gzip => {
            let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            written(encoder, content).finish().unwrap()
        }
        Compression::Zlib => {
            let encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            written(encoder, content).finish().unwrap()
        }
        Compression::Bzip2 => {
            let encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
            written(encoder, content).finish().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_log_file_creation() {
        let temp_file = TempLogFile::new().unwrap();
        assert!(temp_file.path().exists());
        assert_eq!(fs::read(temp_file.path()).unwrap().len(), 0);
    }

    #[test]
    fn test_content_is_written_verbatim() {
        let temp_file = TempLogFile::with_content("hello\nwo").unwrap();
        temp_file.append("rld\n").unwrap();

        assert_eq!(fs::read_to_string(temp_file.path()).unwrap(), "hello\nworld\n");
    }

    #[test]
    fn test_truncate_with() {
        let temp_file = TempLogFile::with_content("a really long string\n").unwrap();
        temp_file.truncate_with("short\n").unwrap();

        assert_eq!(fs::read_to_string(temp_file.path()).unwrap(), "short\n");
    }

    #[test]
    fn test_rotate_keeps_old_file() {
        let temp_file = TempLogFile::with_content("old\n").unwrap();
        temp_file.rotate("new\n").unwrap();

        let rotated = temp_file.path().with_extension("log.1");
        assert_eq!(fs::read_to_string(rotated).unwrap(), "old\n");
        assert_eq!(fs::read_to_string(temp_file.path()).unwrap(), "new\n");
    }

    #[test]
    fn test_atomic_replace() {
        let temp_file = TempLogFile::with_content("old\n").unwrap();
        temp_file.atomic_replace("new\n").unwrap();

        assert_eq!(fs::read_to_string(temp_file.path()).unwrap(), "new\n");
        assert!(!temp_file.path().with_extension("tmp").exists());
    }

    #[test]
    fn test_compress_shrinks_repetitive_content() {
        let content = "the same line\n".repeat(100);
        for format in [Compression::Gzip, Compression::Zlib, Compression::Bzip2] {
            assert!(compress(format, content.as_bytes()).len() < content.len());
        }
    }

    #[test]
    fn test_utf16_helpers() {
        assert_eq!(utf16le("a\n"), vec![b'a', 0, b'\n', 0]);
        assert_eq!(utf16be("a\n"), vec![0, b'a', 0, b'\n']);
    }
}
