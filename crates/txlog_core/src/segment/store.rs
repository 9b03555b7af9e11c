//! Segment store interface consumed by the export path.

use crate::error::CoreResult;
use crate::segment::header::SegmentHeader;
use crate::segment::registry::ReaderId;
use crate::types::LogVersion;
use std::fmt;
use txlog_storage::SegmentChannel;

/// Owner of the physical log segments.
///
/// The export path only needs to enumerate versions, open and read headers,
/// and maintain the per-version reader registry. How segments are written or
/// pruned is up to the implementation.
///
/// # Invariants
///
/// - Retained versions form a contiguous range ending at `highest_version()`
/// - `register_reader`/`unregister_reader` are safe to call concurrently with
///   each other and with pruning, without the retention lock held
/// - A version with registered readers is never deleted
///
/// # Implementors
///
/// - [`super::LogFiles`] - Segments stored as files in a directory
pub trait SegmentStore: Send + Sync + fmt::Debug {
    /// Returns the version of the newest segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot determine its segments.
    fn highest_version(&self) -> CoreResult<LogVersion>;

    /// Opens the segment for `version` for reading, positioned at offset 0.
    ///
    /// # Errors
    ///
    /// Returns `SegmentMissing` if the segment does not exist, or an I/O error.
    fn open_for_read(&self, version: LogVersion) -> CoreResult<Box<dyn SegmentChannel>>;

    /// Reads the header of the segment for `version`.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment is missing or its header is invalid.
    fn extract_header(&self, version: LogVersion) -> CoreResult<SegmentHeader>;

    /// Records an external reader of `version`.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be updated.
    fn register_reader(&self, version: LogVersion, reader: ReaderId) -> CoreResult<()>;

    /// Removes an external reader of `version`. Removing an unknown reader is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be updated.
    fn unregister_reader(&self, version: LogVersion, reader: ReaderId) -> CoreResult<()>;

    /// Returns true if any external reader holds `version`.
    fn has_readers(&self, version: LogVersion) -> bool;
}
