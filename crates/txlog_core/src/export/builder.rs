//! Builds channel sets for transaction log export.

use crate::error::{CoreError, CoreResult};
use crate::export::channel::ReadOnlyChannel;
use crate::export::set::{ChannelDescriptor, ChannelSet};
use crate::index::TransactionIndex;
use crate::retention::RetentionLock;
use crate::segment::{LogFiles, SegmentStore};
use crate::types::{LogPosition, LogVersion, TransactionId};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Exposes the transaction log from a given transaction onward as an ordered
/// set of read-only segment channels.
///
/// # Concurrency
///
/// The retention lock is held while the position is resolved, the segment
/// range is computed, and every channel is opened and registered. Pruning
/// cannot delete a segment in that window. Once the set is returned the lock
/// is released, and the registered readers keep their segments alive until
/// each channel is closed.
///
/// The highest version is read once under the lock. Segments created by a
/// later rotation are not part of the set.
///
/// # Example
///
/// ```rust,ignore
/// let exporter = TransactionLogExporter::for_log_files(log, index);
/// let mut set = exporter.build_channel_set(TransactionId::new(42))?;
/// for descriptor in &mut set {
///     std::io::copy(descriptor.channel_mut(), &mut sink)?;
/// }
/// set.close_all()?;
/// ```
#[derive(Clone)]
pub struct TransactionLogExporter {
    store: Arc<dyn SegmentStore>,
    index: Arc<dyn TransactionIndex>,
    retention: RetentionLock,
}

impl TransactionLogExporter {
    /// Creates an exporter sharing `retention` with the pruning process.
    #[must_use]
    pub fn new(
        store: Arc<dyn SegmentStore>,
        index: Arc<dyn TransactionIndex>,
        retention: RetentionLock,
    ) -> Self {
        Self {
            store,
            index,
            retention,
        }
    }

    /// Creates an exporter over [`LogFiles`], using its retention lock.
    #[must_use]
    pub fn for_log_files(log: Arc<LogFiles>, index: Arc<dyn TransactionIndex>) -> Self {
        let retention = log.retention_lock().clone();
        Self::new(log, index, retention)
    }

    /// Returns the retention lock this exporter takes.
    #[must_use]
    pub fn retention_lock(&self) -> &RetentionLock {
        &self.retention
    }

    /// Opens one read-only channel per segment from the one containing
    /// `starting_tx_id` up to the highest segment.
    ///
    /// The first channel is positioned at the start of `starting_tx_id`; the
    /// others at offset 0. Every channel is registered as a reader of its
    /// segment and must be closed by the caller.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `starting_tx_id` is 0 (checked before any I/O),
    ///   or if it resolves past the highest segment
    /// - `TransactionNotFound` if the index does not know the transaction
    /// - Storage or I/O errors while opening segments or reading headers
    ///
    /// On error no channel stays open or registered.
    pub fn build_channel_set(&self, starting_tx_id: TransactionId) -> CoreResult<ChannelSet> {
        if starting_tx_id.as_u64() == 0 {
            return Err(CoreError::invalid_argument(
                "starting transaction id must be positive",
            ));
        }

        let _retention = self.retention.lock();

        let start = self.resolve_position(starting_tx_id)?;
        let highest = self.store.highest_version()?;
        if start.version > highest {
            return Err(CoreError::invalid_argument(format!(
                "{starting_tx_id} resolves to {start}, beyond highest segment {highest}"
            )));
        }
        debug!(tx = %starting_tx_id, %start, %highest, "resolved export range");

        let channels = self
            .collect_channels(starting_tx_id, start, highest)
            .inspect_err(|e| {
                warn!(tx = %starting_tx_id, error = %e, "export aborted, closing opened channels");
            })?;

        info!(
            tx = %starting_tx_id,
            from = %start.version,
            to = %highest,
            channels = channels.len(),
            "exported transaction log channels"
        );
        Ok(ChannelSet::new(channels))
    }

    fn collect_channels(
        &self,
        starting_tx_id: TransactionId,
        start: LogPosition,
        highest: LogVersion,
    ) -> CoreResult<Vec<ChannelDescriptor>> {
        let exposed = usize::try_from(highest.as_u64() - start.version.as_u64() + 1)
            .map_err(|_| CoreError::invalid_argument("too many segments to export"))?;
        let mut channels = Vec::with_capacity(exposed);

        for version in start.version.through(highest) {
            let first = version == start.version;
            let start_tx_id = if first {
                starting_tx_id
            } else {
                self.store.extract_header(version)?.last_committed_tx_id
            };

            let mut channel = ReadOnlyChannel::open(Arc::clone(&self.store), version)?;
            if first {
                channel.set_position(start.byte_offset)?;
            }
            channels.push(ChannelDescriptor::new(start_tx_id, channel));
        }

        Ok(channels)
    }

    fn resolve_position(&self, tx_id: TransactionId) -> CoreResult<LogPosition> {
        self.index
            .position_of(tx_id)
            .map_err(|e| CoreError::from_index(tx_id, e))
    }
}

impl fmt::Debug for TransactionLogExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionLogExporter")
            .field("store", &self.store)
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}
