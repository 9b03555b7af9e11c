//! Read-only channel over an exported segment.

use crate::error::{CoreError, CoreResult};
use crate::segment::{ReaderId, SegmentStore};
use crate::types::LogVersion;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;
use tracing::{debug, warn};
use txlog_storage::SegmentChannel;

/// A registered, read-only handle onto one exported segment.
///
/// The channel implements [`Read`] and [`Seek`] by delegating to the raw
/// segment channel. It has no write or truncate operations at all, so an
/// exported segment cannot be modified through it:
///
/// ```compile_fail
/// use std::io::Write;
///
/// fn overwrite(channel: &mut txlog_core::ReadOnlyChannel) {
///     channel.write_all(b"not allowed").unwrap();
/// }
/// ```
///
/// While open, the channel is registered as a reader of its version, which
/// keeps pruning away from the segment. [`ReadOnlyChannel::close`]
/// deregisters it and releases the file; dropping an open channel does the
/// same.
pub struct ReadOnlyChannel {
    version: LogVersion,
    reader: ReaderId,
    inner: Box<dyn SegmentChannel>,
    store: Arc<dyn SegmentStore>,
    closed: bool,
}

impl ReadOnlyChannel {
    /// Opens the segment for `version` and registers the new reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment cannot be opened or registered. A
    /// failed registration leaves nothing registered and the file closed.
    pub(crate) fn open(store: Arc<dyn SegmentStore>, version: LogVersion) -> CoreResult<Self> {
        let mut inner = store.open_for_read(version)?;
        let reader = ReaderId::next();
        if let Err(e) = store.register_reader(version, reader) {
            if let Err(close_err) = inner.close() {
                warn!(%version, error = %close_err, "failed to close unregistered segment channel");
            }
            return Err(e);
        }
        debug!(%version, %reader, "opened read-only segment channel");

        Ok(Self {
            version,
            reader,
            inner,
            store,
            closed: false,
        })
    }

    /// Returns the segment version this channel reads.
    #[must_use]
    pub fn version(&self) -> LogVersion {
        self.version
    }

    /// Returns the reader id this channel is registered under.
    #[must_use]
    pub fn reader_id(&self) -> ReaderId {
        self.reader
    }

    /// Returns true once the channel has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns the current read position.
    ///
    /// # Errors
    ///
    /// Returns `ChannelClosed` after close, or a storage error.
    pub fn position(&self) -> CoreResult<u64> {
        self.ensure_open()?;
        Ok(self.inner.position()?)
    }

    /// Moves the read position to an absolute offset.
    ///
    /// # Errors
    ///
    /// Returns `ChannelClosed` after close, or a storage error.
    pub fn set_position(&mut self, position: u64) -> CoreResult<()> {
        self.ensure_open()?;
        self.inner.seek_to(position)?;
        Ok(())
    }

    /// Returns the current size of the segment.
    ///
    /// # Errors
    ///
    /// Returns `ChannelClosed` after close, or a storage error.
    pub fn size(&self) -> CoreResult<u64> {
        self.ensure_open()?;
        Ok(self.inner.size()?)
    }

    /// Deregisters the reader and closes the underlying handle.
    ///
    /// Deregistration happens first and is attempted even if closing the
    /// handle then fails. If both fail, both errors are returned together.
    /// Closing an already closed channel does nothing.
    ///
    /// # Errors
    ///
    /// Returns the deregistration or close failure.
    pub fn close(&mut self) -> CoreResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let unregistered = self.store.unregister_reader(self.version, self.reader);
        let closed = self.inner.close().map_err(CoreError::from);
        debug!(version = %self.version, reader = %self.reader, "closed read-only segment channel");

        match (unregistered, closed) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(unregister), Err(close)) => Err(CoreError::ChannelClose {
                version: self.version,
                unregister: Box::new(unregister),
                close: Box::new(close),
            }),
        }
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.closed {
            return Err(CoreError::ChannelClosed {
                version: self.version,
            });
        }
        Ok(())
    }

    fn closed_io_error(&self) -> io::Error {
        io::Error::new(
            io::ErrorKind::BrokenPipe,
            CoreError::ChannelClosed {
                version: self.version,
            },
        )
    }
}

impl Read for ReadOnlyChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(self.closed_io_error());
        }
        Ok(self.inner.read(buf)?)
    }
}

impl Seek for ReadOnlyChannel {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if self.closed {
            return Err(self.closed_io_error());
        }
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.inner.position()?.checked_add_signed(delta),
            SeekFrom::End(delta) => self.inner.size()?.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )
        })?;
        self.inner.seek_to(target)?;
        Ok(target)
    }
}

impl Drop for ReadOnlyChannel {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.close() {
            warn!(version = %self.version, error = %e, "failed to close dropped segment channel");
        }
    }
}

impl fmt::Debug for ReadOnlyChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOnlyChannel")
            .field("version", &self.version)
            .field("reader", &self.reader)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::segment::{LogFiles, HEADER_SIZE};
    use tempfile::tempdir;

    fn open_channel(log: &Arc<LogFiles>) -> ReadOnlyChannel {
        let store: Arc<dyn SegmentStore> = Arc::clone(log) as Arc<dyn SegmentStore>;
        ReadOnlyChannel::open(store, LogVersion::new(0)).unwrap()
    }

    fn log_with(data: &[u8]) -> (tempfile::TempDir, Arc<LogFiles>) {
        let dir = tempdir().unwrap();
        let log = LogFiles::open(dir.path(), Config::default().sync_on_rotate(false)).unwrap();
        log.append(data).unwrap();
        (dir, Arc::new(log))
    }

    #[test]
    fn open_registers_reader() {
        let (_dir, log) = log_with(b"abc");
        let channel = open_channel(&log);

        assert_eq!(channel.version(), LogVersion::new(0));
        assert_eq!(log.registry().reader_count(LogVersion::new(0)), 1);
        assert!(log.has_readers(LogVersion::new(0)));
        assert_eq!(channel.position().unwrap(), 0);
        assert_eq!(channel.size().unwrap(), HEADER_SIZE as u64 + 3);
    }

    #[test]
    fn seek_variants() {
        let (_dir, log) = log_with(b"0123456789");
        let mut channel = open_channel(&log);
        let body = HEADER_SIZE as u64;

        assert_eq!(channel.seek(SeekFrom::Start(body + 2)).unwrap(), body + 2);
        assert_eq!(channel.seek(SeekFrom::Current(3)).unwrap(), body + 5);
        assert_eq!(channel.seek(SeekFrom::End(-1)).unwrap(), body + 9);

        let mut buf = [0u8; 4];
        assert_eq!(channel.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'9');

        let err = channel.seek(SeekFrom::Current(-1000)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn close_is_idempotent() {
        let (_dir, log) = log_with(b"abc");
        let mut channel = open_channel(&log);

        channel.close().unwrap();
        assert!(channel.is_closed());
        assert!(!log.has_readers(LogVersion::new(0)));

        channel.close().unwrap();
        assert_eq!(log.registry().total_readers(), 0);
    }

    #[test]
    fn use_after_close_fails() {
        let (_dir, log) = log_with(b"abc");
        let mut channel = open_channel(&log);
        channel.close().unwrap();

        assert!(matches!(channel.position(), Err(CoreError::ChannelClosed { .. })));
        assert!(matches!(channel.set_position(1), Err(CoreError::ChannelClosed { .. })));
        let mut buf = [0u8; 1];
        let err = channel.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn drop_deregisters() {
        let (_dir, log) = log_with(b"abc");
        let channel = open_channel(&log);
        let second = open_channel(&log);
        assert_eq!(log.registry().reader_count(LogVersion::new(0)), 2);

        drop(channel);
        assert_eq!(log.registry().reader_count(LogVersion::new(0)), 1);
        drop(second);
        assert!(!log.has_readers(LogVersion::new(0)));
    }

    #[test]
    fn segment_is_untouched_by_reading() {
        let (dir, log) = log_with(b"payload");
        let path = dir.path().join("txlog.0");
        let before = std::fs::read(&path).unwrap();

        let mut channel = open_channel(&log);
        let mut all = Vec::new();
        channel.read_to_end(&mut all).unwrap();
        channel.close().unwrap();

        assert_eq!(all, before);
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }
}
