//! Segment header codec.
//!
//! Every segment starts with a fixed 32-byte header written when the segment
//! is created by rotation:
//!
//! ```text
//! | magic (4) | format (2) | reserved (2) | log_version (8) | last_committed_tx (8) | reserved (4) | crc32 (4) |
//! ```
//!
//! All integers are little-endian. The CRC covers the first 28 bytes.

use crate::error::{CoreError, CoreResult};
use crate::types::{LogVersion, TransactionId};
use txlog_storage::SegmentChannel;

/// Magic bytes identifying a segment file.
pub const SEGMENT_MAGIC: [u8; 4] = *b"ETXL";

/// Current segment header format.
pub const SEGMENT_FORMAT: u16 = 1;

/// Size of the segment header in bytes. Transaction data starts here.
pub const HEADER_SIZE: usize = 32;

const CRC_OFFSET: usize = HEADER_SIZE - 4;

/// Header recorded at the start of every segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Version of the segment this header belongs to.
    pub log_version: LogVersion,
    /// Last transaction fully committed before this segment was created.
    pub last_committed_tx_id: TransactionId,
}

impl SegmentHeader {
    /// Creates a new header.
    #[must_use]
    pub const fn new(log_version: LogVersion, last_committed_tx_id: TransactionId) -> Self {
        Self {
            log_version,
            last_committed_tx_id,
        }
    }

    /// Encodes the header into its on-disk form.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&SEGMENT_MAGIC);
        buf[4..6].copy_from_slice(&SEGMENT_FORMAT.to_le_bytes());
        buf[8..16].copy_from_slice(&self.log_version.as_u64().to_le_bytes());
        buf[16..24].copy_from_slice(&self.last_committed_tx_id.as_u64().to_le_bytes());
        let crc = crc32fast::hash(&buf[..CRC_OFFSET]);
        buf[CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Decodes a header from the first [`HEADER_SIZE`] bytes of `data`.
    ///
    /// # Errors
    ///
    /// Returns `SegmentCorruption` if the data is short, the magic or format
    /// is wrong, or the checksum does not match.
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(CoreError::segment_corruption(format!(
                "segment header truncated: {} of {HEADER_SIZE} bytes",
                data.len()
            )));
        }
        let data = &data[..HEADER_SIZE];

        if data[0..4] != SEGMENT_MAGIC {
            return Err(CoreError::segment_corruption("invalid segment magic"));
        }

        let format = u16::from_le_bytes([data[4], data[5]]);
        if format != SEGMENT_FORMAT {
            return Err(CoreError::segment_corruption(format!(
                "unsupported segment format {format}"
            )));
        }

        let stored_crc = u32::from_le_bytes(read_array(&data[CRC_OFFSET..]));
        let actual_crc = crc32fast::hash(&data[..CRC_OFFSET]);
        if stored_crc != actual_crc {
            return Err(CoreError::segment_corruption(format!(
                "segment header checksum mismatch: expected {stored_crc:08x}, got {actual_crc:08x}"
            )));
        }

        Ok(Self {
            log_version: LogVersion::new(u64::from_le_bytes(read_array(&data[8..16]))),
            last_committed_tx_id: TransactionId::new(u64::from_le_bytes(read_array(
                &data[16..24],
            ))),
        })
    }

    /// Reads and decodes the header from the start of a channel.
    ///
    /// The channel is left positioned just after the header.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the header is invalid.
    pub fn read_from(channel: &mut dyn SegmentChannel) -> CoreResult<Self> {
        channel.seek_to(0)?;
        let mut buf = [0u8; HEADER_SIZE];
        let mut filled = 0;
        while filled < HEADER_SIZE {
            let n = channel.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Self::decode(&buf[..filled])
    }

    /// Checks that the header belongs to the expected segment version.
    ///
    /// # Errors
    ///
    /// Returns `SegmentCorruption` on mismatch.
    pub fn expect_version(self, version: LogVersion) -> CoreResult<Self> {
        if self.log_version != version {
            return Err(CoreError::segment_corruption(format!(
                "segment {version} carries header for {}",
                self.log_version
            )));
        }
        Ok(self)
    }
}

fn read_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&slice[..N]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use txlog_storage::MemoryChannel;

    fn header() -> SegmentHeader {
        SegmentHeader::new(LogVersion::new(7), TransactionId::new(1234))
    }

    #[test]
    fn encode_layout() {
        let bytes = header().encode();
        assert_eq!(&bytes[0..4], b"ETXL");
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), SEGMENT_FORMAT);
        assert_eq!(bytes[8], 7);
        assert_eq!(u64::from_le_bytes(read_array(&bytes[16..24])), 1234);
    }

    #[test]
    fn decode_encoded_header() {
        assert_eq!(SegmentHeader::decode(&header().encode()).unwrap(), header());
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let mut data = header().encode().to_vec();
        data.extend_from_slice(b"transaction data");
        assert_eq!(SegmentHeader::decode(&data).unwrap(), header());
    }

    #[test]
    fn decode_rejects_truncated() {
        let bytes = header().encode();
        let err = SegmentHeader::decode(&bytes[..20]).unwrap_err();
        assert!(matches!(err, CoreError::SegmentCorruption { .. }));
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let mut bytes = header().encode();
        bytes[0] = b'X';
        assert!(SegmentHeader::decode(&bytes).is_err());
    }

    #[test]
    fn decode_rejects_flipped_bit() {
        let mut bytes = header().encode();
        bytes[17] ^= 0x01;
        let err = SegmentHeader::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn read_from_channel_leaves_cursor_after_header() {
        let mut data = header().encode().to_vec();
        data.extend_from_slice(b"payload");
        let mut channel = MemoryChannel::new(data);
        channel.seek_to(10).unwrap();

        let decoded = SegmentHeader::read_from(&mut channel).unwrap();
        assert_eq!(decoded, header());
        assert_eq!(channel.position().unwrap(), HEADER_SIZE as u64);
    }

    #[test]
    fn expect_version_detects_misnamed_segment() {
        assert!(header().expect_version(LogVersion::new(7)).is_ok());
        assert!(header().expect_version(LogVersion::new(8)).is_err());
    }
}
