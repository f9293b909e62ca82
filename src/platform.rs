//! Platform specific file handling: opening with delete sharing and
//! detecting files that are being deleted while still held open.

use std::io;
use std::path::Path;
use tokio::fs::{File, OpenOptions};

/// Reports whether a file behind an open handle has been queued for deletion.
///
/// On Windows a file deleted while another handle is open lingers in a
/// delete-pending state: its name is still visible but it can no longer be
/// reopened. Platforms without that state always report `false`.
pub(crate) trait DeletePending: Send + Sync {
    fn is_delete_pending(&self, file: &File) -> io::Result<bool>;
}

/// The probe for the platform the crate was built for.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct NativeProbe;

#[cfg(windows)]
impl DeletePending for NativeProbe {
    fn is_delete_pending(&self, file: &File) -> io::Result<bool> {
        use std::os::windows::io::AsRawHandle;
        use windows_sys::Win32::Storage::FileSystem::{
            FILE_STANDARD_INFO, FileStandardInfo, GetFileInformationByHandleEx,
        };

        let mut info: FILE_STANDARD_INFO = unsafe { std::mem::zeroed() };
        let result = unsafe {
            GetFileInformationByHandleEx(
                file.as_raw_handle() as _,
                FileStandardInfo,
                &mut info as *mut FILE_STANDARD_INFO as *mut _,
                std::mem::size_of::<FILE_STANDARD_INFO>() as u32,
            )
        };
        if result == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(info.DeletePending as u8 != 0)
    }
}

#[cfg(not(windows))]
impl DeletePending for NativeProbe {
    fn is_delete_pending(&self, _file: &File) -> io::Result<bool> {
        Ok(false)
    }
}

/// Whether a stat error means the file is on its way out. Windows answers
/// access denied for names whose file is delete-pending.
pub(crate) fn is_delete_in_progress(err: &io::Error) -> bool {
    cfg!(windows) && err.kind() == io::ErrorKind::PermissionDenied
}

/// Opens `path` read-only. On Windows the handle shares read, write and
/// delete access so writers can still rotate the file.
pub(crate) async fn open_file(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true);

    #[cfg(windows)]
    {
        use windows_sys::Win32::Storage::FileSystem::{
            FILE_SHARE_DELETE, FILE_SHARE_READ, FILE_SHARE_WRITE,
        };
        options.share_mode(FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE);
    }

    options.open(path).await
}
