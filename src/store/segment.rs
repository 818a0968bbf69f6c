//! Pool file segments
//!
//! Every append becomes one segment: a count, two checksums and the values.
//!
//! The count has its own checksum so a damaged count is told apart from a
//! body cut short by a crash.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{PoolError, Result};

/// Segment header size: Count (4) + Header CRC32 (4) + Body CRC32 (4)
pub const SEGMENT_HEADER_SIZE: usize = 12;

/// Size of one stored value (i64, little endian)
pub const VALUE_SIZE: usize = 8;

/// Result of scanning a run of segments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentScan {
    /// Number of complete, valid segments
    pub segments: u64,

    /// Total values across those segments
    pub values: u64,

    /// Bytes covered by complete, valid segments
    pub valid_bytes: u64,

    /// Bytes of an incomplete trailing segment (torn write)
    pub torn_bytes: u64,
}

/// Encode a batch of values as a single segment
///
/// Format: count (4) + header crc (4) + body crc (4) + count × value (8)
pub fn encode_segment(values: &[i64]) -> Result<Bytes> {
    let count = u32::try_from(values.len()).map_err(|_| {
        PoolError::InvalidInput(format!("too many values in one append: {}", values.len()))
    })?;

    let mut body = BytesMut::with_capacity(values.len() * VALUE_SIZE);
    for value in values {
        body.put_i64_le(*value);
    }

    let mut segment = BytesMut::with_capacity(SEGMENT_HEADER_SIZE + body.len());
    segment.put_u32_le(count);
    segment.put_u32_le(header_crc(count));
    segment.put_u32_le(crc32fast::hash(&body));
    segment.extend_from_slice(&body);

    Ok(segment.freeze())
}

/// Walk `buf` as consecutive segments
///
/// Decoded values are pushed into `out` when given. Scanning stops at the
/// first incomplete segment, whose length is reported as `torn_bytes`.
/// Only a short header, or a short body behind an intact header, counts as
/// incomplete. A header or body whose checksum does not match is `Corruption`.
pub fn scan_segments(buf: &[u8], mut out: Option<&mut Vec<i64>>) -> Result<SegmentScan> {
    let mut scan = SegmentScan::default();
    let mut rest = buf;

    while rest.len() >= SEGMENT_HEADER_SIZE {
        let mut header = &rest[..SEGMENT_HEADER_SIZE];
        let count = header.get_u32_le();
        let stored_header_crc = header.get_u32_le();
        let stored_body_crc = header.get_u32_le();

        let actual_header_crc = header_crc(count);
        if actual_header_crc != stored_header_crc {
            return Err(PoolError::Corruption(format!(
                "segment {} at offset {}: header checksum mismatch (stored {:08x}, computed {:08x})",
                scan.segments, scan.valid_bytes, stored_header_crc, actual_header_crc
            )));
        }

        let body_len = count as usize * VALUE_SIZE;
        if rest.len() - SEGMENT_HEADER_SIZE < body_len {
            break;
        }

        let body = &rest[SEGMENT_HEADER_SIZE..SEGMENT_HEADER_SIZE + body_len];
        let actual_body_crc = crc32fast::hash(body);
        if actual_body_crc != stored_body_crc {
            return Err(PoolError::Corruption(format!(
                "segment {} at offset {}: checksum mismatch (stored {:08x}, computed {:08x})",
                scan.segments, scan.valid_bytes, stored_body_crc, actual_body_crc
            )));
        }

        if let Some(out) = out.as_mut() {
            out.reserve(count as usize);
            let mut values = body;
            while values.has_remaining() {
                out.push(values.get_i64_le());
            }
        }

        scan.segments += 1;
        scan.values += count as u64;
        scan.valid_bytes += (SEGMENT_HEADER_SIZE + body_len) as u64;
        rest = &rest[SEGMENT_HEADER_SIZE + body_len..];
    }

    scan.torn_bytes = rest.len() as u64;
    Ok(scan)
}

fn header_crc(count: u32) -> u32 {
    crc32fast::hash(&count.to_le_bytes())
}
