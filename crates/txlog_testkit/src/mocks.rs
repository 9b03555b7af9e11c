//! Mock collaborators for the export path.
//!
//! [`MockSegmentStore`] keeps segments in memory and can be scripted to fail
//! at any step of an export. [`MockTransactionIndex`] answers from a fixed
//! map and can hold a caller inside `position_of` until released.

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use txlog_core::{
    CoreError, CoreResult, IndexError, IndexResult, LogPosition, LogVersion, ReaderId,
    ReaderRegistry, SegmentHeader, SegmentStore, TransactionId, TransactionIndex, HEADER_SIZE,
};
use txlog_storage::{MemoryChannel, SegmentChannel, StorageError, StorageResult};

/// One step of the segment store protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StoreStep {
    /// `open_for_read`
    Open,
    /// `extract_header`
    ExtractHeader,
    /// `register_reader`
    Register,
    /// `unregister_reader`
    Unregister,
    /// Closing a channel returned by `open_for_read`.
    Close,
}

/// Number of calls a [`MockSegmentStore`] has received, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    /// Calls to `highest_version`.
    pub highest_version: usize,
    /// Calls to `open_for_read`.
    pub open: usize,
    /// Calls to `extract_header`.
    pub extract_header: usize,
    /// Calls to `register_reader`.
    pub register: usize,
    /// Calls to `unregister_reader`.
    pub unregister: usize,
    /// Channels closed.
    pub close: usize,
}

impl StoreCalls {
    /// Returns the total number of store calls.
    pub fn total(&self) -> usize {
        self.highest_version
            + self.open
            + self.extract_header
            + self.register
            + self.unregister
            + self.close
    }
}

#[derive(Debug, Default)]
struct Counters {
    highest_version: AtomicUsize,
    open: AtomicUsize,
    extract_header: AtomicUsize,
    register: AtomicUsize,
    unregister: AtomicUsize,
    close: Arc<AtomicUsize>,
}

#[derive(Debug)]
struct MockSegment {
    data: Arc<RwLock<Vec<u8>>>,
    header: SegmentHeader,
}

/// An in-memory segment store.
///
/// Segment bytes are an encoded [`SegmentHeader`] followed by the body given
/// to [`MockSegmentStore::push_segment`]. `extract_header` returns the stored
/// header value without decoding, so tests can hand out headers that differ
/// from the bytes.
#[derive(Debug, Default)]
pub struct MockSegmentStore {
    segments: RwLock<BTreeMap<LogVersion, MockSegment>>,
    registry: ReaderRegistry,
    failures: Mutex<BTreeSet<(StoreStep, LogVersion)>>,
    counters: Counters,
}

impl MockSegmentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with one segment per `(last_committed, body)` entry.
    pub fn with_segments<'a>(segments: impl IntoIterator<Item = (u64, &'a [u8])>) -> Self {
        let store = Self::new();
        for (last_committed, body) in segments {
            store.push_segment(TransactionId::new(last_committed), body);
        }
        store
    }

    /// Appends a new highest segment and returns its version.
    pub fn push_segment(&self, last_committed: TransactionId, body: &[u8]) -> LogVersion {
        let mut segments = self.segments.write();
        let version = segments
            .keys()
            .next_back()
            .map_or(LogVersion::new(0), |v| v.next());
        let header = SegmentHeader::new(version, last_committed);

        let mut data = header.encode().to_vec();
        data.extend_from_slice(body);
        segments.insert(
            version,
            MockSegment {
                data: Arc::new(RwLock::new(data)),
                header,
            },
        );
        version
    }

    /// Replaces the header `extract_header` returns for `version`.
    pub fn set_header(&self, version: LogVersion, header: SegmentHeader) {
        if let Some(segment) = self.segments.write().get_mut(&version) {
            segment.header = header;
        }
    }

    /// Removes a segment, as if it had been pruned behind the store's back.
    pub fn remove_segment(&self, version: LogVersion) {
        self.segments.write().remove(&version);
    }

    /// Makes `step` fail for `version` from now on.
    pub fn fail(&self, step: StoreStep, version: LogVersion) {
        self.failures.lock().insert((step, version));
    }

    /// Clears all scripted failures.
    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Returns a copy of the bytes of `version`.
    pub fn segment_bytes(&self, version: LogVersion) -> Option<Vec<u8>> {
        self.segments
            .read()
            .get(&version)
            .map(|segment| segment.data.read().clone())
    }

    /// Returns the reader registry.
    pub fn registry(&self) -> &ReaderRegistry {
        &self.registry
    }

    /// Returns call counts so far.
    pub fn calls(&self) -> StoreCalls {
        let c = &self.counters;
        StoreCalls {
            highest_version: c.highest_version.load(Ordering::SeqCst),
            open: c.open.load(Ordering::SeqCst),
            extract_header: c.extract_header.load(Ordering::SeqCst),
            register: c.register.load(Ordering::SeqCst),
            unregister: c.unregister.load(Ordering::SeqCst),
            close: c.close.load(Ordering::SeqCst),
        }
    }

    fn should_fail(&self, step: StoreStep, version: LogVersion) -> bool {
        self.failures.lock().contains(&(step, version))
    }
}

fn injected(step: StoreStep, version: LogVersion) -> io::Error {
    io::Error::other(format!("injected {step:?} failure for {version}"))
}

impl SegmentStore for MockSegmentStore {
    fn highest_version(&self) -> CoreResult<LogVersion> {
        self.counters.highest_version.fetch_add(1, Ordering::SeqCst);
        self.segments
            .read()
            .keys()
            .next_back()
            .copied()
            .ok_or_else(|| CoreError::SegmentMissing {
                version: LogVersion::new(0),
            })
    }

    fn open_for_read(&self, version: LogVersion) -> CoreResult<Box<dyn SegmentChannel>> {
        self.counters.open.fetch_add(1, Ordering::SeqCst);
        if self.should_fail(StoreStep::Open, version) {
            return Err(injected(StoreStep::Open, version).into());
        }
        let segments = self.segments.read();
        let segment = segments
            .get(&version)
            .ok_or(CoreError::SegmentMissing { version })?;

        Ok(Box::new(ScriptedChannel {
            inner: MemoryChannel::shared(Arc::clone(&segment.data)),
            fail_close: self.should_fail(StoreStep::Close, version),
            closes: Arc::clone(&self.counters.close),
        }))
    }

    fn extract_header(&self, version: LogVersion) -> CoreResult<SegmentHeader> {
        self.counters.extract_header.fetch_add(1, Ordering::SeqCst);
        if self.should_fail(StoreStep::ExtractHeader, version) {
            return Err(CoreError::segment_corruption(format!(
                "injected header failure for {version}"
            )));
        }
        self.segments
            .read()
            .get(&version)
            .map(|segment| segment.header)
            .ok_or(CoreError::SegmentMissing { version })
    }

    fn register_reader(&self, version: LogVersion, reader: ReaderId) -> CoreResult<()> {
        self.counters.register.fetch_add(1, Ordering::SeqCst);
        if self.should_fail(StoreStep::Register, version) {
            return Err(injected(StoreStep::Register, version).into());
        }
        self.registry.register(version, reader);
        Ok(())
    }

    fn unregister_reader(&self, version: LogVersion, reader: ReaderId) -> CoreResult<()> {
        self.counters.unregister.fetch_add(1, Ordering::SeqCst);
        if self.should_fail(StoreStep::Unregister, version) {
            return Err(injected(StoreStep::Unregister, version).into());
        }
        self.registry.unregister(version, reader);
        Ok(())
    }

    fn has_readers(&self, version: LogVersion) -> bool {
        self.registry.has_readers(version)
    }
}

/// Memory channel whose close can be scripted to fail.
#[derive(Debug)]
struct ScriptedChannel {
    inner: MemoryChannel,
    fail_close: bool,
    closes: Arc<AtomicUsize>,
}

impl SegmentChannel for ScriptedChannel {
    fn read(&mut self, buf: &mut [u8]) -> StorageResult<usize> {
        self.inner.read(buf)
    }

    fn position(&self) -> StorageResult<u64> {
        self.inner.position()
    }

    fn seek_to(&mut self, position: u64) -> StorageResult<()> {
        self.inner.seek_to(position)
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn close(&mut self) -> StorageResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close()?;
        if self.fail_close {
            return Err(StorageError::Io(io::Error::other("injected close failure")));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// A point where [`MockTransactionIndex::position_of`] stops until released.
#[derive(Debug)]
pub struct IndexGate {
    entered: Barrier,
    release: Barrier,
}

impl IndexGate {
    /// Blocks until a caller is inside `position_of`.
    pub fn wait_entered(&self) {
        self.entered.wait();
    }

    /// Lets the caller inside `position_of` continue.
    pub fn release(&self) {
        self.release.wait();
    }
}

/// A transaction index answering from a fixed map.
#[derive(Debug, Default)]
pub struct MockTransactionIndex {
    positions: RwLock<BTreeMap<TransactionId, LogPosition>>,
    store_failure: Mutex<Option<String>>,
    gate: Mutex<Option<Arc<IndexGate>>>,
    calls: AtomicUsize,
}

impl MockTransactionIndex {
    /// Creates an empty index; every lookup fails with `NoSuchTransaction`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index from known positions.
    pub fn from_positions(positions: impl IntoIterator<Item = (TransactionId, LogPosition)>) -> Self {
        let index = Self::new();
        index.positions.write().extend(positions);
        index
    }

    /// Creates an index placing `tx_id` at the first byte after the header of
    /// `version`.
    pub fn at_segment_start(tx_id: u64, version: u64) -> Self {
        Self::from_positions([(
            TransactionId::new(tx_id),
            LogPosition::new(LogVersion::new(version), HEADER_SIZE as u64),
        )])
    }

    /// Adds or replaces a position.
    pub fn insert(&self, tx_id: TransactionId, position: LogPosition) {
        self.positions.write().insert(tx_id, position);
    }

    /// Makes every lookup fail with a store error carrying `message`.
    pub fn fail_with_store_error(&self, message: impl Into<String>) {
        *self.store_failure.lock() = Some(message.into());
    }

    /// Installs a gate; the next `position_of` call waits on it.
    pub fn install_gate(&self) -> Arc<IndexGate> {
        let gate = Arc::new(IndexGate {
            entered: Barrier::new(2),
            release: Barrier::new(2),
        });
        *self.gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Returns the number of `position_of` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TransactionIndex for MockTransactionIndex {
    fn position_of(&self, tx_id: TransactionId) -> IndexResult<LogPosition> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            gate.entered.wait();
            gate.release.wait();
        }

        if let Some(message) = self.store_failure.lock().clone() {
            return Err(CoreError::segment_corruption(message).into());
        }
        self.positions
            .read()
            .get(&tx_id)
            .copied()
            .ok_or_else(|| IndexError::no_such_transaction(tx_id, "not in mock index"))
    }
}
