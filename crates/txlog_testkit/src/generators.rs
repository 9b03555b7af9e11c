//! Property-based test generators using proptest.
//!
//! A layout is a list of transaction counts, one per segment, in the form
//! [`crate::TestLog::with_layout`] accepts.

use proptest::prelude::*;

/// Largest number of segments a generated layout has.
pub const MAX_SEGMENTS: usize = 6;

/// Largest number of transactions a generated segment holds.
pub const MAX_TX_PER_SEGMENT: usize = 4;

/// Strategy for generating segment layouts where every segment holds at
/// least one transaction.
pub fn segment_layout_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1..=MAX_TX_PER_SEGMENT, 1..=MAX_SEGMENTS)
}

/// Strategy for generating a layout together with a transaction id that the
/// layout contains.
pub fn layout_and_start_strategy() -> impl Strategy<Value = (Vec<usize>, u64)> {
    segment_layout_strategy().prop_flat_map(|layout| {
        let total = layout.iter().sum::<usize>() as u64;
        (Just(layout), 1..=total)
    })
}

/// Returns the segment index that holds `tx_id` in `layout`.
///
/// Transaction ids start at 1, as in [`crate::TestLog::with_layout`].
pub fn segment_of(layout: &[usize], tx_id: u64) -> Option<usize> {
    let mut last = 0u64;
    for (segment, &count) in layout.iter().enumerate() {
        last += count as u64;
        if tx_id >= 1 && tx_id <= last {
            return Some(segment);
        }
    }
    None
}

/// Returns the last transaction id of every segment in `layout`.
pub fn last_tx_ids(layout: &[usize]) -> Vec<u64> {
    layout
        .iter()
        .scan(0u64, |last, &count| {
            *last += count as u64;
            Some(*last)
        })
        .collect()
}
