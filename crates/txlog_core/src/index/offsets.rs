//! In-memory transaction offset index.

use crate::index::{IndexError, IndexResult, TransactionIndex};
use crate::types::{LogPosition, LogVersion, TransactionId};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Exact transaction positions recorded as transactions are appended.
///
/// The writer calls [`TransactionOffsets::record`] after appending each
/// transaction, and [`TransactionOffsets::forget_before`] after pruning so
/// the index never points into a deleted segment.
#[derive(Debug, Default)]
pub struct TransactionOffsets {
    positions: RwLock<BTreeMap<TransactionId, LogPosition>>,
}

impl TransactionOffsets {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records where `tx_id` begins.
    pub fn record(&self, tx_id: TransactionId, position: LogPosition) {
        self.positions.write().insert(tx_id, position);
    }

    /// Drops every transaction that begins in a segment older than `version`.
    ///
    /// Returns the number of forgotten transactions.
    pub fn forget_before(&self, version: LogVersion) -> usize {
        let mut positions = self.positions.write();
        let before = positions.len();
        positions.retain(|_, position| position.version >= version);
        before - positions.len()
    }

    /// Returns the oldest indexed transaction.
    #[must_use]
    pub fn first_tx_id(&self) -> Option<TransactionId> {
        self.positions.read().keys().next().copied()
    }

    /// Returns the newest indexed transaction.
    #[must_use]
    pub fn last_tx_id(&self) -> Option<TransactionId> {
        self.positions.read().keys().next_back().copied()
    }

    /// Returns the number of indexed transactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.read().len()
    }

    /// Returns true if no transaction is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.read().is_empty()
    }
}

impl TransactionIndex for TransactionOffsets {
    fn position_of(&self, tx_id: TransactionId) -> IndexResult<LogPosition> {
        let positions = self.positions.read();
        if let Some(position) = positions.get(&tx_id) {
            return Ok(*position);
        }

        let reason = match (positions.keys().next(), positions.keys().next_back()) {
            (Some(first), _) if tx_id < *first => format!("older than oldest retained {first}"),
            (_, Some(last)) if tx_id > *last => format!("newer than newest {last}"),
            (None, None) => String::from("no transactions retained"),
            _ => String::from("not recorded"),
        };
        Err(IndexError::no_such_transaction(tx_id, reason))
    }
}
