//! Physical log segments.
//!
//! A transaction log is a sequence of segment files with increasing versions.
//! Every segment begins with a [`SegmentHeader`] recording the last transaction
//! committed before it was created, which lets a reader check continuity
//! across segments.
//!
//! ## Invariants
//!
//! - Retained versions are contiguous: `lowest..=highest`
//! - Only the highest segment receives appends
//! - A segment with registered readers is never pruned

mod files;
mod header;
mod registry;
mod store;

pub use files::{LogFiles, PruneReport};
pub use header::{SegmentHeader, HEADER_SIZE, SEGMENT_FORMAT, SEGMENT_MAGIC};
pub use registry::{ReaderId, ReaderRegistry};
pub use store::SegmentStore;
