//! File-based segment channel.

use crate::channel::SegmentChannel;
use crate::error::{StorageError, StorageResult};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// A segment file opened for reading only.
///
/// The file is opened without write access, so even the OS rejects any
/// attempt to modify it through this handle.
///
/// # Example
///
/// ```no_run
/// use txlog_storage::{FileChannel, SegmentChannel};
/// use std::path::Path;
///
/// let mut channel = FileChannel::open(Path::new("txlog.0")).unwrap();
/// let mut buf = [0u8; 32];
/// let n = channel.read(&mut buf).unwrap();
/// channel.close().unwrap();
/// ```
#[derive(Debug)]
pub struct FileChannel {
    path: PathBuf,
    file: Option<File>,
    position: u64,
}

impl FileChannel {
    /// Opens an existing segment file for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be opened.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            position: 0,
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&self) -> StorageResult<&File> {
        self.file.as_ref().ok_or(StorageError::Closed)
    }

    fn file_mut(&mut self) -> StorageResult<&mut File> {
        self.file.as_mut().ok_or(StorageError::Closed)
    }
}

impl SegmentChannel for FileChannel {
    fn read(&mut self, buf: &mut [u8]) -> StorageResult<usize> {
        let file = self.file_mut()?;
        let n = file.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn position(&self) -> StorageResult<u64> {
        self.file()?;
        Ok(self.position)
    }

    fn seek_to(&mut self, position: u64) -> StorageResult<()> {
        let file = self.file_mut()?;
        self.position = file.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.file()?.metadata()?.len())
    }

    fn close(&mut self) -> StorageResult<()> {
        // Dropping the handle closes the descriptor.
        self.file.take();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.file.is_none()
    }
}
