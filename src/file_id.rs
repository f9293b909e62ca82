//! Platform-independent file identity: device + inode on Unix, volume serial
//! number + file index on Windows.
//!
//! Identity survives renames, so comparing the identity of the open handle
//! with the identity of whatever currently lives at the path tells whether
//! the file was rotated away underneath the tailer.

use std::fmt;
use std::fs::Metadata;
use std::io;
use std::path::Path;
use tokio::fs::File;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    dev: u64,
    ino: u64,
}

impl FileId {
    /// Identity of an open handle.
    #[cfg(unix)]
    pub(crate) async fn of_file(file: &File) -> io::Result<Self> {
        let metadata = file.metadata().await?;
        Ok(Self::from_metadata(&metadata))
    }

    /// Identity of an open handle.
    #[cfg(windows)]
    pub(crate) async fn of_file(file: &File) -> io::Result<Self> {
        use std::os::windows::io::AsRawHandle;
        use windows_sys::Win32::Storage::FileSystem::{
            BY_HANDLE_FILE_INFORMATION, GetFileInformationByHandle,
        };

        let handle = file.as_raw_handle();
        let mut info: BY_HANDLE_FILE_INFORMATION = unsafe { std::mem::zeroed() };

        let result = unsafe { GetFileInformationByHandle(handle as _, &mut info) };
        if result == 0 {
            return Err(io::Error::last_os_error());
        }

        let file_index = ((info.nFileIndexHigh as u64) << 32) | (info.nFileIndexLow as u64);
        Ok(Self {
            dev: info.dwVolumeSerialNumber as u64,
            ino: file_index,
        })
    }

    /// Identity and metadata of whatever currently lives at `path`.
    #[cfg(unix)]
    pub(crate) async fn of_path(path: &Path) -> io::Result<(Self, Metadata)> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok((Self::from_metadata(&metadata), metadata))
    }

    /// Identity and metadata of whatever currently lives at `path`.
    ///
    /// Windows only exposes the file index through a handle, so the path is
    /// briefly opened with full sharing.
    #[cfg(windows)]
    pub(crate) async fn of_path(path: &Path) -> io::Result<(Self, Metadata)> {
        let file = crate::platform::open_file(path).await?;
        let id = Self::of_file(&file).await?;
        let metadata = file.metadata().await?;
        Ok((id, metadata))
    }

    #[cfg(unix)]
    fn from_metadata(metadata: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        }
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dev, self.ino)
    }
}
