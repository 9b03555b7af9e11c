//! In-memory segment channel for testing.

use crate::channel::SegmentChannel;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// A segment channel over shared in-memory bytes.
///
/// Several channels may view the same bytes; each keeps its own cursor.
/// Suitable for:
/// - Unit tests
/// - Mock segment stores
///
/// # Example
///
/// ```rust
/// use txlog_storage::{MemoryChannel, SegmentChannel};
///
/// let mut channel = MemoryChannel::new(b"segment bytes".to_vec());
/// channel.seek_to(8).unwrap();
/// let mut buf = [0u8; 5];
/// assert_eq!(channel.read(&mut buf).unwrap(), 5);
/// assert_eq!(&buf, b"bytes");
/// ```
#[derive(Debug, Clone)]
pub struct MemoryChannel {
    data: Arc<RwLock<Vec<u8>>>,
    position: u64,
    closed: bool,
}

impl MemoryChannel {
    /// Creates a channel over its own copy of `data`.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self::shared(Arc::new(RwLock::new(data)))
    }

    /// Creates a channel viewing bytes shared with other owners.
    #[must_use]
    pub fn shared(data: Arc<RwLock<Vec<u8>>>) -> Self {
        Self {
            data,
            position: 0,
            closed: false,
        }
    }

    /// Returns a copy of all bytes behind the channel.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

impl SegmentChannel for MemoryChannel {
    fn read(&mut self, buf: &mut [u8]) -> StorageResult<usize> {
        self.ensure_open()?;
        let data = self.data.read();
        let size = data.len() as u64;
        if self.position >= size || buf.is_empty() {
            return Ok(0);
        }

        let start = self.position as usize;
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        drop(data);
        self.position += n as u64;
        Ok(n)
    }

    fn position(&self) -> StorageResult<u64> {
        self.ensure_open()?;
        Ok(self.position)
    }

    fn seek_to(&mut self, position: u64) -> StorageResult<()> {
        self.ensure_open()?;
        self.position = position;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        self.ensure_open()?;
        Ok(self.data.read().len() as u64)
    }

    fn close(&mut self) -> StorageResult<()> {
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
