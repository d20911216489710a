//! Frame handling: decode a buffer holding an optional header followed by repeated records.
//!
//! Records are parsed back to back with the same format until the buffer is exhausted.
//! The first record that fails to parse (or consumes nothing) ends the loop; whatever is
//! left is reported as trailing bytes together with the reason, so nothing is dropped.

use crate::ast::Descriptor;
use crate::error::LayoutError;
use crate::value::Record;
use log::debug;
use std::ops::Range;

/// Result of decoding a frame.
#[derive(Debug)]
pub struct FrameDecodeResult {
    /// Header record, when a header format was given.
    pub header: Option<Record>,
    /// Records that parsed successfully, in buffer order.
    pub records: Vec<DecodedRecord>,
    /// Bytes after the last record, if any.
    pub trailing: Option<Trailing>,
}

#[derive(Debug)]
pub struct DecodedRecord {
    pub index: usize,
    pub record: Record,
    pub byte_range: Range<usize>,
}

#[derive(Debug)]
pub struct Trailing {
    pub range: Range<usize>,
    /// Why record parsing stopped before the end; `None` if the last record consumed nothing.
    pub reason: Option<LayoutError>,
}

/// Decode a frame: optional `header` first (its failure fails the whole frame), then as
/// many `record`s as fit.
pub fn decode_frame(
    header: Option<&Descriptor>,
    record: &Descriptor,
    bytes: &[u8],
) -> Result<FrameDecodeResult, LayoutError> {
    let (header_record, mut offset) = match header {
        Some(h) => {
            let parsed = h.parse(bytes)?;
            (Some(parsed.record), parsed.consumed.end)
        }
        None => (None, 0),
    };

    let mut records = Vec::new();
    let mut reason = None;

    while offset < bytes.len() {
        match record.parse(&bytes[offset..]) {
            Ok(parsed) if parsed.consumed.end == 0 => break,
            Ok(parsed) => {
                let end = offset + parsed.consumed.end;
                records.push(DecodedRecord {
                    index: records.len(),
                    record: parsed.record,
                    byte_range: offset..end,
                });
                offset = end;
            }
            Err(e) => {
                debug!("record {} at 0x{:x} failed: {}", records.len(), offset, e);
                reason = Some(e);
                break;
            }
        }
    }

    let trailing = if offset < bytes.len() {
        Some(Trailing {
            range: offset..bytes.len(),
            reason,
        })
    } else {
        None
    };

    Ok(FrameDecodeResult {
        header: header_record,
        records,
        trailing,
    })
}
