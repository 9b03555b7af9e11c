//! Error types for txlog core.

use crate::index::IndexError;
use crate::types::{LogVersion, TransactionId};
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in txlog core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Segment storage error.
    #[error("storage error: {0}")]
    Storage(#[from] txlog_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An argument was rejected before any work was done.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected argument.
        message: String,
    },

    /// The transaction is not present in the retained log.
    #[error("transaction id {} not found in transaction logs", .tx_id.as_u64())]
    TransactionNotFound {
        /// The transaction that was requested.
        tx_id: TransactionId,
    },

    /// Transaction index failure other than a missing transaction.
    #[error("transaction index error: {0}")]
    Index(IndexError),

    /// No segment file exists for the version.
    #[error("segment {version} does not exist")]
    SegmentMissing {
        /// The requested segment version.
        version: LogVersion,
    },

    /// Segment header is corrupted or invalid.
    #[error("segment corruption: {message}")]
    SegmentCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// The channel was used after it was closed.
    #[error("channel for segment {version} is closed")]
    ChannelClosed {
        /// Segment version of the closed channel.
        version: LogVersion,
    },

    /// Both steps of closing a channel failed.
    #[error("closing channel for segment {version} failed: unregister: {unregister}; close: {close}")]
    ChannelClose {
        /// Segment version of the channel.
        version: LogVersion,
        /// Failure removing the reader from the registry.
        unregister: Box<CoreError>,
        /// Failure releasing the underlying handle.
        close: Box<CoreError>,
    },
}

impl CoreError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a segment corruption error.
    pub fn segment_corruption(message: impl Into<String>) -> Self {
        Self::SegmentCorruption {
            message: message.into(),
        }
    }

    /// Creates a transaction not found error.
    pub fn transaction_not_found(tx_id: TransactionId) -> Self {
        Self::TransactionNotFound { tx_id }
    }

    /// Translates an index failure for `tx_id` into a core error.
    ///
    /// `NoSuchTransaction` becomes [`CoreError::TransactionNotFound`] carrying
    /// `tx_id`; anything else is wrapped as [`CoreError::Index`].
    pub fn from_index(tx_id: TransactionId, err: IndexError) -> Self {
        match err {
            IndexError::NoSuchTransaction { .. } => Self::transaction_not_found(tx_id),
            other => Self::Index(other),
        }
    }

    /// Returns true if this is a [`CoreError::TransactionNotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TransactionNotFound { .. })
    }
}
