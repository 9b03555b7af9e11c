//! Segment channel trait definition.

use crate::error::StorageResult;
use std::fmt;

/// A readable, seekable handle onto one physical log segment.
///
/// Channels are **opaque byte readers**. They know nothing about segment
/// headers, transactions, or the reader registry - the core owns all of that.
/// A channel only moves a cursor over the segment's bytes.
///
/// # Invariants
///
/// - `read` starts at `position()` and advances it by the returned count
/// - `read` returns `0` only at the end of the segment (or for an empty buffer)
/// - `seek_to` may move the cursor past the end; later reads then return `0`
/// - After `close`, every operation fails with [`super::StorageError::Closed`]
///   and further `close` calls are no-ops
///
/// There is intentionally no write or truncate operation: exported segments
/// must never be mutated through a channel.
///
/// # Implementors
///
/// - [`super::FileChannel`] - A segment file opened read-only
/// - [`super::MemoryChannel`] - Shared in-memory bytes, for tests
pub trait SegmentChannel: Send + fmt::Debug {
    /// Reads up to `buf.len()` bytes at the current position.
    ///
    /// Returns the number of bytes read.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is closed or an I/O error occurs.
    fn read(&mut self, buf: &mut [u8]) -> StorageResult<usize>;

    /// Returns the current cursor position.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is closed.
    fn position(&self) -> StorageResult<u64>;

    /// Moves the cursor to an absolute byte offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is closed or the seek fails.
    fn seek_to(&mut self, position: u64) -> StorageResult<()>;

    /// Returns the current size of the segment in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is closed or the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Releases the underlying handle.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing the handle fails.
    fn close(&mut self) -> StorageResult<()>;

    /// Returns true once `close` has been called.
    fn is_closed(&self) -> bool;
}
