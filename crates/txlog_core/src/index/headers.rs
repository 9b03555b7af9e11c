//! Segment-granular index derived from segment headers.

use crate::error::CoreError;
use crate::index::{IndexError, IndexResult, TransactionIndex};
use crate::segment::{SegmentStore, HEADER_SIZE};
use crate::types::{LogPosition, LogVersion, TransactionId};
use std::sync::Arc;

/// Resolves transactions that open a segment.
///
/// A segment whose header says `last_committed = N` holds transactions
/// `N + 1` onwards, so headers alone give the exact position of every
/// segment's first transaction and nothing else. [`TransactionIndex::position_of`]
/// answers only for those ids; [`HeaderIndex::segment_start_of`] maps any
/// retained id to the first transaction of its segment.
///
/// Headers cannot tell where the log ends. Unless the newest committed id is
/// supplied with [`HeaderIndex::with_last_committed`], ids past the first
/// transaction of the highest segment are treated as unknown.
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    store: Arc<dyn SegmentStore>,
    last_committed: Option<TransactionId>,
}

impl HeaderIndex {
    /// Creates an index over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SegmentStore>) -> Self {
        Self {
            store,
            last_committed: None,
        }
    }

    /// Bounds the index at `last_committed`, the newest transaction written.
    #[must_use]
    pub fn with_last_committed(mut self, last_committed: TransactionId) -> Self {
        self.last_committed = Some(last_committed);
        self
    }

    /// Returns the segment holding `tx_id` and the first transaction in it.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NoSuchTransaction`] if `tx_id` was pruned or is
    /// newer than the newest known transaction.
    pub fn segment_start_of(
        &self,
        tx_id: TransactionId,
    ) -> IndexResult<(LogVersion, TransactionId)> {
        let highest = self.store.highest_version()?;

        for version in LogVersion::new(0).through(highest).rev() {
            let header = match self.store.extract_header(version) {
                Ok(header) => header,
                Err(CoreError::SegmentMissing { .. }) => {
                    return Err(IndexError::no_such_transaction(
                        tx_id,
                        format!("older than oldest retained segment {}", version.next()),
                    ));
                }
                Err(e) => return Err(e.into()),
            };

            if header.last_committed_tx_id >= tx_id {
                continue;
            }
            let first = header.last_committed_tx_id.next();
            let newest = match self.last_committed {
                Some(last) => last,
                None if version == highest => first,
                None => tx_id,
            };
            if tx_id > newest {
                return Err(IndexError::no_such_transaction(
                    tx_id,
                    format!("newer than newest transaction {newest}"),
                ));
            }
            return Ok((version, first));
        }

        Err(IndexError::no_such_transaction(
            tx_id,
            "not present in any segment",
        ))
    }
}

impl TransactionIndex for HeaderIndex {
    fn position_of(&self, tx_id: TransactionId) -> IndexResult<LogPosition> {
        let (version, first) = self.segment_start_of(tx_id)?;
        if first != tx_id {
            return Err(IndexError::no_such_transaction(
                tx_id,
                format!("segment {version} starts at transaction {first}"),
            ));
        }
        Ok(LogPosition::new(version, HEADER_SIZE as u64))
    }
}
