//! # txlog testkit
//!
//! Test utilities for the transaction log export path.
//!
//! This crate provides:
//! - On-disk log fixtures with a known transaction layout
//! - Mock segment stores and transaction indexes with scripted failures
//! - Property-based test generators using proptest
//! - Concurrent export stress harnesses
//!
//! ## Usage
//!
//! ```rust,ignore
//! use txlog_testkit::prelude::*;
//!
//! #[test]
//! fn exports_tail() {
//!     let log = TestLog::with_layout(&[2, 2, 2]);
//!     let set = log.exporter().build_channel_set(TransactionId::new(3)).unwrap();
//!     assert_eq!(set.len(), 2);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::mocks::*;
    pub use crate::stress::*;
    pub use txlog_core::{
        ChannelSet, CoreError, LogPosition, LogVersion, TransactionId, TransactionLogExporter,
    };
}

pub use fixtures::*;
pub use generators::*;
pub use mocks::*;
pub use stress::*;
