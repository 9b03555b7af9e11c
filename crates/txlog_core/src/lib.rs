//! # txlog Core
//!
//! Transaction log export for an embedded database's write-ahead log.
//!
//! This crate provides:
//! - Segment store interface and a directory-backed implementation
//! - Segment headers with last-committed transaction continuity
//! - Per-version reader registry consulted by pruning
//! - Retention lock shared between export and pruning
//! - Transaction index interface and implementations
//! - Read-only channel sets for backup and replication readers
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use txlog_core::{Config, LogFiles, TransactionId, TransactionLogExporter, TransactionOffsets};
//!
//! let log = Arc::new(LogFiles::open(std::path::Path::new("data/txlog"), Config::default()).unwrap());
//! let index = Arc::new(TransactionOffsets::new());
//! index.record(TransactionId::new(1), log.append(b"tx-1").unwrap());
//!
//! let exporter = TransactionLogExporter::for_log_files(Arc::clone(&log), index);
//! let mut set = exporter.build_channel_set(TransactionId::new(1)).unwrap();
//! for descriptor in &mut set {
//!     std::io::copy(descriptor.channel_mut(), &mut std::io::sink()).unwrap();
//! }
//! set.close_all().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod export;
mod index;
mod retention;
mod segment;
mod types;

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use export::{ChannelDescriptor, ChannelSet, ReadOnlyChannel, TransactionLogExporter};
pub use index::{HeaderIndex, IndexError, IndexResult, TransactionIndex, TransactionOffsets};
pub use retention::{RetentionGuard, RetentionLock};
pub use segment::{
    LogFiles, PruneReport, ReaderId, ReaderRegistry, SegmentHeader, SegmentStore, HEADER_SIZE,
    SEGMENT_FORMAT, SEGMENT_MAGIC,
};
pub use types::{LogPosition, LogVersion, TransactionId};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
