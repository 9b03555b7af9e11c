//! On-disk log fixtures.
//!
//! [`TestLog`] owns a temporary directory with a [`LogFiles`] store and a
//! [`TransactionOffsets`] index that are kept in step: every transaction the
//! fixture writes is appended to the current segment and recorded in the
//! index.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use txlog_core::{
    Config, HeaderIndex, LogFiles, LogPosition, LogVersion, SegmentStore, TransactionId,
    TransactionIndex, TransactionLogExporter, TransactionOffsets,
};

/// Returns the bytes the fixtures write for `tx_id`.
#[must_use]
pub fn tx_payload(tx_id: TransactionId) -> Vec<u8> {
    format!("tx-{};", tx_id.as_u64()).into_bytes()
}

/// A transaction log in a temporary directory with automatic cleanup.
pub struct TestLog {
    log: Arc<LogFiles>,
    index: Arc<TransactionOffsets>,
    written: Mutex<Written>,
    // Dropped last so the directory outlives the store.
    _dir: TempDir,
}

#[derive(Default)]
struct Written {
    last_tx: u64,
    positions: BTreeMap<TransactionId, LogPosition>,
}

impl TestLog {
    /// Creates an empty log holding only segment 0.
    pub fn new() -> Self {
        Self::with_config(Config::default().sync_on_rotate(false))
    }

    /// Creates an empty log with a custom configuration.
    pub fn with_config(config: Config) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let log = LogFiles::open(dir.path(), config).expect("Failed to open transaction log");

        Self {
            log: Arc::new(log),
            index: Arc::new(TransactionOffsets::new()),
            written: Mutex::new(Written::default()),
            _dir: dir,
        }
    }

    /// Creates a log where segment `i` holds `layout[i]` transactions.
    ///
    /// Transaction ids start at 1 and increase by one. `&[2, 2, 2]` puts
    /// transactions 1-2 in v0, 3-4 in v1 and 5-6 in v2.
    pub fn with_layout(layout: &[usize]) -> Self {
        let log = Self::new();
        for (segment, &count) in layout.iter().enumerate() {
            if segment > 0 {
                log.rotate();
            }
            log.write_transactions(count);
        }
        log
    }

    /// Appends one transaction to the current segment and indexes it.
    pub fn write_transaction(&self) -> (TransactionId, LogPosition) {
        let mut written = self.written.lock();
        let tx_id = TransactionId::new(written.last_tx + 1);
        let position = self
            .log
            .append(&tx_payload(tx_id))
            .expect("Failed to append transaction");
        self.index.record(tx_id, position);
        written.last_tx = tx_id.as_u64();
        written.positions.insert(tx_id, position);
        (tx_id, position)
    }

    /// Appends `count` transactions and returns their ids.
    pub fn write_transactions(&self, count: usize) -> Vec<TransactionId> {
        (0..count).map(|_| self.write_transaction().0).collect()
    }

    /// Starts a new segment after the last written transaction.
    pub fn rotate(&self) -> LogVersion {
        let last = self.last_tx_id();
        self.log.rotate(last).expect("Failed to rotate transaction log")
    }

    /// Returns the last written transaction, or `TransactionId::NONE`.
    pub fn last_tx_id(&self) -> TransactionId {
        TransactionId::new(self.written.lock().last_tx)
    }

    /// Returns where `tx_id` was written.
    pub fn position_of(&self, tx_id: TransactionId) -> Option<LogPosition> {
        self.written.lock().positions.get(&tx_id).copied()
    }

    /// Returns every written transaction with its position.
    pub fn positions(&self) -> Vec<(TransactionId, LogPosition)> {
        self.written
            .lock()
            .positions
            .iter()
            .map(|(tx, pos)| (*tx, *pos))
            .collect()
    }

    /// Prunes segments below `keep_from` and forgets their transactions.
    ///
    /// The index forgets first, so an export never resolves into a segment
    /// that is being deleted.
    pub fn prune(&self, keep_from: LogVersion) -> txlog_core::PruneReport {
        self.index.forget_before(keep_from);
        self.log
            .prune_up_to(keep_from)
            .expect("Failed to prune transaction log")
    }

    /// Returns the segment store.
    pub fn log(&self) -> &Arc<LogFiles> {
        &self.log
    }

    /// Returns the offset index.
    pub fn index(&self) -> &Arc<TransactionOffsets> {
        &self.index
    }

    /// Returns the log directory.
    pub fn dir(&self) -> &Path {
        self.log.dir()
    }

    /// Returns an exporter over the store using the offset index.
    pub fn exporter(&self) -> TransactionLogExporter {
        self.exporter_with(Arc::clone(&self.index) as Arc<dyn TransactionIndex>)
    }

    /// Returns a header-derived index bounded at the last written transaction.
    pub fn header_index(&self) -> HeaderIndex {
        let store = Arc::clone(&self.log) as Arc<dyn SegmentStore>;
        HeaderIndex::new(store).with_last_committed(self.last_tx_id())
    }

    /// Returns an exporter over the store using [`TestLog::header_index`].
    pub fn header_exporter(&self) -> TransactionLogExporter {
        self.exporter_with(Arc::new(self.header_index()))
    }

    /// Returns an exporter over the store using `index`.
    pub fn exporter_with(&self, index: Arc<dyn TransactionIndex>) -> TransactionLogExporter {
        TransactionLogExporter::for_log_files(Arc::clone(&self.log), index)
    }

    /// Reads the raw bytes of every retained segment.
    pub fn snapshot(&self) -> BTreeMap<LogVersion, Vec<u8>> {
        self.log
            .versions()
            .into_iter()
            .map(|version| {
                let bytes = std::fs::read(self.log.segment_path(version))
                    .expect("Failed to read segment file");
                (version, bytes)
            })
            .collect()
    }
}

impl Default for TestLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestLog {
    type Target = LogFiles;

    fn deref(&self) -> &Self::Target {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txlog_core::HEADER_SIZE;

    #[test]
    fn test_empty_log() {
        let log = TestLog::new();
        assert_eq!(log.versions(), vec![LogVersion::new(0)]);
        assert_eq!(log.last_tx_id(), TransactionId::NONE);
        assert!(log.index().is_empty());
    }

    #[test]
    fn test_layout() {
        let log = TestLog::with_layout(&[2, 1, 3]);
        assert_eq!(log.versions().len(), 3);
        assert_eq!(log.last_tx_id(), TransactionId::new(6));
        assert_eq!(log.index().len(), 6);

        let third = log.position_of(TransactionId::new(3)).unwrap();
        assert_eq!(third, LogPosition::new(LogVersion::new(1), HEADER_SIZE as u64));

        let header = log.extract_header(LogVersion::new(2)).unwrap();
        assert_eq!(header.last_committed_tx_id, TransactionId::new(3));
    }

    #[test]
    fn test_snapshot_contains_payloads() {
        let log = TestLog::with_layout(&[1, 1]);
        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot[&LogVersion::new(1)].ends_with(b"tx-2;"));
    }

    #[test]
    fn test_prune_forgets_transactions() {
        let log = TestLog::with_layout(&[1, 1, 1]);
        let report = log.prune(LogVersion::new(2));
        assert_eq!(report.deleted.len(), 2);
        assert_eq!(log.index().first_tx_id(), Some(TransactionId::new(3)));
    }
}
