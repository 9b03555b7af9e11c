//! Ordered set of exported segment channels.

use crate::error::CoreResult;
use crate::export::channel::ReadOnlyChannel;
use crate::types::{LogVersion, TransactionId};

/// One exported segment and the transaction its data starts from.
#[derive(Debug)]
pub struct ChannelDescriptor {
    start_tx_id: TransactionId,
    channel: ReadOnlyChannel,
}

impl ChannelDescriptor {
    pub(crate) fn new(start_tx_id: TransactionId, channel: ReadOnlyChannel) -> Self {
        Self {
            start_tx_id,
            channel,
        }
    }

    /// Returns the transaction id the segment continues from.
    ///
    /// For the first descriptor of a set this is the requested starting
    /// transaction. For the others it is the last transaction committed
    /// before the segment was created, as recorded in its header.
    #[must_use]
    pub fn start_tx_id(&self) -> TransactionId {
        self.start_tx_id
    }

    /// Returns the segment version.
    #[must_use]
    pub fn version(&self) -> LogVersion {
        self.channel.version()
    }

    /// Returns the channel.
    #[must_use]
    pub fn channel(&self) -> &ReadOnlyChannel {
        &self.channel
    }

    /// Returns the channel for reading.
    pub fn channel_mut(&mut self) -> &mut ReadOnlyChannel {
        &mut self.channel
    }

    /// Takes ownership of the channel.
    #[must_use]
    pub fn into_channel(self) -> ReadOnlyChannel {
        self.channel
    }
}

/// The channels produced by one export, ordered by ascending segment version.
///
/// A set always holds at least one channel. Only the first channel may start
/// at a non-zero offset.
#[derive(Debug)]
pub struct ChannelSet {
    descriptors: Vec<ChannelDescriptor>,
}

impl ChannelSet {
    pub(crate) fn new(descriptors: Vec<ChannelDescriptor>) -> Self {
        debug_assert!(!descriptors.is_empty(), "channel set must not be empty");
        debug_assert!(
            descriptors
                .windows(2)
                .all(|pair| pair[1].version() == pair[0].version().next()),
            "channel set versions must be consecutive"
        );
        Self { descriptors }
    }

    /// Returns the number of channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true if the set holds no channels. Never true for a built set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Returns the descriptors in version order.
    #[must_use]
    pub fn descriptors(&self) -> &[ChannelDescriptor] {
        &self.descriptors
    }

    /// Returns the descriptors for reading.
    pub fn descriptors_mut(&mut self) -> &mut [ChannelDescriptor] {
        &mut self.descriptors
    }

    /// Iterates over the descriptors in version order.
    pub fn iter(&self) -> std::slice::Iter<'_, ChannelDescriptor> {
        self.descriptors.iter()
    }

    /// Iterates mutably over the descriptors in version order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, ChannelDescriptor> {
        self.descriptors.iter_mut()
    }

    /// Returns the segment versions, ascending.
    #[must_use]
    pub fn versions(&self) -> Vec<LogVersion> {
        self.descriptors.iter().map(ChannelDescriptor::version).collect()
    }

    /// Returns each descriptor's start transaction, in version order.
    ///
    /// Consumers can use these to verify that no transaction was skipped
    /// between consecutive segments.
    #[must_use]
    pub fn start_tx_ids(&self) -> Vec<TransactionId> {
        self.descriptors
            .iter()
            .map(ChannelDescriptor::start_tx_id)
            .collect()
    }

    /// Closes every channel, continuing past failures.
    ///
    /// # Errors
    ///
    /// Returns the first close failure after all channels were attempted.
    pub fn close_all(&mut self) -> CoreResult<()> {
        let mut first_error = None;
        for descriptor in &mut self.descriptors {
            if let Err(e) = descriptor.channel.close() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Takes ownership of the descriptors.
    #[must_use]
    pub fn into_descriptors(self) -> Vec<ChannelDescriptor> {
        self.descriptors
    }
}

impl IntoIterator for ChannelSet {
    type Item = ChannelDescriptor;
    type IntoIter = std::vec::IntoIter<ChannelDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChannelSet {
    type Item = &'a ChannelDescriptor;
    type IntoIter = std::slice::Iter<'a, ChannelDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}

impl<'a> IntoIterator for &'a mut ChannelSet {
    type Item = &'a mut ChannelDescriptor;
    type IntoIter = std::slice::IterMut<'a, ChannelDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter_mut()
    }
}
