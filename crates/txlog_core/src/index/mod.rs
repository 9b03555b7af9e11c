//! Transaction index: from transaction id to log position.
//!
//! The export path only relies on the [`TransactionIndex`] contract. How an
//! index learns positions is up to the implementation.
//!
//! # Implementations
//!
//! - [`TransactionOffsets`]: exact positions recorded by the log writer
//! - [`HeaderIndex`]: segment-granular positions derived from segment headers

mod headers;
mod offsets;

pub use headers::HeaderIndex;
pub use offsets::TransactionOffsets;

use crate::error::CoreError;
use crate::types::{LogPosition, TransactionId};
use std::fmt;
use thiserror::Error;

/// Result type for index lookups.
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors reported by a transaction index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The transaction is outside the retained log.
    #[error("no such transaction {tx_id}: {reason}")]
    NoSuchTransaction {
        /// The requested transaction.
        tx_id: TransactionId,
        /// Why the lookup failed.
        reason: String,
    },

    /// The segment store failed while resolving a position.
    #[error("segment store error: {0}")]
    Store(#[source] Box<CoreError>),
}

impl IndexError {
    /// Creates a no-such-transaction error.
    pub fn no_such_transaction(tx_id: TransactionId, reason: impl Into<String>) -> Self {
        Self::NoSuchTransaction {
            tx_id,
            reason: reason.into(),
        }
    }
}

impl From<CoreError> for IndexError {
    fn from(err: CoreError) -> Self {
        Self::Store(Box::new(err))
    }
}

/// Maps transaction ids to the log position where they begin.
pub trait TransactionIndex: Send + Sync + fmt::Debug {
    /// Returns the position of the first byte of `tx_id`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NoSuchTransaction`] if `tx_id` is older than the
    /// oldest retained transaction or newer than the newest one.
    fn position_of(&self, tx_id: TransactionId) -> IndexResult<LogPosition>;
}
