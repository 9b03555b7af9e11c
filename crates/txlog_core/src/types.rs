//! Core type definitions for txlog.

use std::fmt;

/// Unique identifier for a transaction.
///
/// Transaction IDs are monotonically increasing and never reused.
/// Valid transactions start at 1; `0` means "no transaction committed yet"
/// and only ever appears in segment headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// The id recorded before any transaction has committed.
    pub const NONE: Self = Self(0);

    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next transaction ID.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Version number of a physical log segment.
///
/// Versions are assigned in increasing order at segment creation, so the
/// retained segments always form a contiguous range `lowest..=highest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LogVersion(pub u64);

impl LogVersion {
    /// Creates a new log version.
    #[must_use]
    pub const fn new(version: u64) -> Self {
        Self(version)
    }

    /// Returns the raw version value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next log version.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Iterates over every version from `self` up to and including `last`.
    ///
    /// Empty if `last < self`.
    pub fn through(self, last: Self) -> impl DoubleEndedIterator<Item = Self> {
        (self.0..=last.0).map(Self)
    }
}

impl fmt::Display for LogVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// An exact byte within a specific log segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogPosition {
    /// The segment holding the byte.
    pub version: LogVersion,
    /// Offset from the start of the segment file.
    pub byte_offset: u64,
}

impl LogPosition {
    /// Creates a new log position.
    #[must_use]
    pub const fn new(version: LogVersion, byte_offset: u64) -> Self {
        Self {
            version,
            byte_offset,
        }
    }

    /// Returns the segment version.
    #[must_use]
    pub const fn version(&self) -> LogVersion {
        self.version
    }

    /// Returns the byte offset within the segment.
    #[must_use]
    pub const fn byte_offset(&self) -> u64 {
        self.byte_offset
    }
}

impl fmt::Display for LogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.version, self.byte_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_id_ordering() {
        let t1 = TransactionId::new(1);
        let t2 = t1.next();
        assert!(t1 < t2);
        assert_eq!(t2.as_u64(), 2);
    }

    #[test]
    fn log_version_through_is_inclusive() {
        let versions: Vec<_> = LogVersion::new(3).through(LogVersion::new(5)).collect();
        assert_eq!(
            versions,
            vec![LogVersion::new(3), LogVersion::new(4), LogVersion::new(5)]
        );
        assert_eq!(LogVersion::new(7).through(LogVersion::new(7)).count(), 1);
        assert_eq!(LogVersion::new(8).through(LogVersion::new(7)).count(), 0);
    }

    #[test]
    fn position_ordering_follows_version_then_offset() {
        let a = LogPosition::new(LogVersion::new(1), 500);
        let b = LogPosition::new(LogVersion::new(2), 0);
        assert!(a < b);
    }

    #[test]
    fn position_display() {
        let p = LogPosition::new(LogVersion::new(4), 128);
        assert_eq!(p.to_string(), "v4@128");
        assert_eq!(TransactionId::new(9).to_string(), "txn:9");
    }
}
