//! Per-version registry of external segment readers.
//!
//! Pruning consults the registry before deleting a segment. Exported channels
//! insert themselves when opened and remove themselves when closed, so the
//! registry (not the retention lock) is what protects a segment for as long as
//! a reader holds it.

use crate::types::LogVersion;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_READER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one open external reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReaderId(u64);

impl ReaderId {
    /// Allocates a process-wide unique reader id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_READER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reader:{}", self.0)
    }
}

/// Concurrent mapping from segment version to its open readers.
///
/// All operations take a short internal lock that is never held across I/O,
/// so the registry can be mutated and queried without the retention lock.
#[derive(Debug, Default)]
pub struct ReaderRegistry {
    readers: Mutex<BTreeMap<LogVersion, BTreeSet<ReaderId>>>,
}

impl ReaderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `reader` as reading `version`.
    ///
    /// Returns false if the reader was already registered for that version.
    pub fn register(&self, version: LogVersion, reader: ReaderId) -> bool {
        self.readers.lock().entry(version).or_default().insert(reader)
    }

    /// Removes `reader` from `version`.
    ///
    /// Returns false if the reader was not registered, so a second removal is
    /// observable but harmless.
    pub fn unregister(&self, version: LogVersion, reader: ReaderId) -> bool {
        let mut readers = self.readers.lock();
        let Some(set) = readers.get_mut(&version) else {
            return false;
        };
        let removed = set.remove(&reader);
        if set.is_empty() {
            readers.remove(&version);
        }
        removed
    }

    /// Returns true if any reader holds `version`.
    #[must_use]
    pub fn has_readers(&self, version: LogVersion) -> bool {
        self.readers.lock().contains_key(&version)
    }

    /// Returns the number of readers holding `version`.
    #[must_use]
    pub fn reader_count(&self, version: LogVersion) -> usize {
        self.readers.lock().get(&version).map_or(0, BTreeSet::len)
    }

    /// Returns the total number of registered readers.
    #[must_use]
    pub fn total_readers(&self) -> usize {
        self.readers.lock().values().map(BTreeSet::len).sum()
    }

    /// Returns every version that currently has readers, ascending.
    #[must_use]
    pub fn versions_in_use(&self) -> Vec<LogVersion> {
        self.readers.lock().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn reader_ids_are_unique() {
        let a = ReaderId::next();
        let b = ReaderId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn register_and_unregister() {
        let registry = ReaderRegistry::new();
        let v = LogVersion::new(3);
        let reader = ReaderId::next();

        assert!(registry.register(v, reader));
        assert!(!registry.register(v, reader));
        assert!(registry.has_readers(v));
        assert_eq!(registry.reader_count(v), 1);

        assert!(registry.unregister(v, reader));
        assert!(!registry.unregister(v, reader));
        assert!(!registry.has_readers(v));
        assert_eq!(registry.total_readers(), 0);
    }

    #[test]
    fn versions_are_tracked_independently() {
        let registry = ReaderRegistry::new();
        let r1 = ReaderId::next();
        let r2 = ReaderId::next();

        registry.register(LogVersion::new(1), r1);
        registry.register(LogVersion::new(2), r1);
        registry.register(LogVersion::new(2), r2);

        assert_eq!(
            registry.versions_in_use(),
            vec![LogVersion::new(1), LogVersion::new(2)]
        );
        registry.unregister(LogVersion::new(2), r1);
        assert_eq!(registry.reader_count(LogVersion::new(2)), 1);
        assert_eq!(registry.total_readers(), 2);
    }

    #[test]
    fn unregister_unknown_version() {
        let registry = ReaderRegistry::new();
        assert!(!registry.unregister(LogVersion::new(9), ReaderId::next()));
    }

    #[test]
    fn concurrent_register_unregister() {
        let registry = Arc::new(ReaderRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let version = LogVersion::new(i % 3);
                    for _ in 0..200 {
                        let reader = ReaderId::next();
                        assert!(registry.register(version, reader));
                        let _ = registry.has_readers(version);
                        assert!(registry.unregister(version, reader));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.total_readers(), 0);
    }
}
