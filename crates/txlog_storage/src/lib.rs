//! # txlog Storage
//!
//! Raw segment channels for the txlog export path.
//!
//! This crate provides the lowest-level I/O for log segments. Channels are
//! **opaque byte readers** - they do not interpret segment headers or
//! transactions.
//!
//! ## Design Principles
//!
//! - Readers get a [`SegmentChannel`] (read, seek, size, close) and nothing else
//! - Writing goes through a separate [`SegmentAppender`] that readers never see
//! - Must be `Send` so channels can move to consumer threads
//! - The core owns all segment format interpretation
//!
//! ## Available Channels
//!
//! - [`FileChannel`] - A segment file opened read-only
//! - [`MemoryChannel`] - Shared in-memory bytes for tests
//!
//! ## Example
//!
//! ```rust
//! use txlog_storage::{MemoryChannel, SegmentChannel};
//!
//! let mut channel = MemoryChannel::new(b"hello world".to_vec());
//! let mut buf = [0u8; 5];
//! channel.read(&mut buf).unwrap();
//! assert_eq!(&buf, b"hello");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod appender;
mod channel;
mod error;
mod file;
mod memory;

pub use appender::SegmentAppender;
pub use channel::SegmentChannel;
pub use error::{StorageError, StorageResult};
pub use file::FileChannel;
pub use memory::MemoryChannel;
