//! Transaction log export.
//!
//! Given a starting transaction, [`TransactionLogExporter`] produces a
//! [`ChannelSet`]: one [`ReadOnlyChannel`] per segment from the segment
//! holding that transaction through the highest segment.
//!
//! ## Invariants
//!
//! - Channels are ordered by ascending, consecutive segment version
//! - Only the first channel starts at a non-zero offset
//! - Every open channel is registered as a reader of its segment
//! - Closing a channel deregisters it exactly once
//! - A failed build leaves no channel open or registered

mod builder;
mod channel;
mod set;

pub use builder::TransactionLogExporter;
pub use channel::ReadOnlyChannel;
pub use set::{ChannelDescriptor, ChannelSet};
